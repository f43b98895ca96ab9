//! Integration tests for mycare-api
//!
//! Uses wiremock to simulate the MyCare share-link endpoints and verifies
//! end-to-end behavior of the ShareLinkClient, both on its own and driven
//! by the ShareAccessFlow use case.

mod common;

mod test_access_flow;
mod test_downloads;
mod test_share_info;
