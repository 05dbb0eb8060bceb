pub mod claims_testkit;
