//! End-to-end tests for the session controller and payroll operations.
//!
//! Every collaborator is replaced by an in-memory mock from [`mocks`]:
//!
//! | Scenario group | Covers                                                        |
//! |----------------|---------------------------------------------------------------|
//! | `lifecycle`    | connect pipeline, single flight, degraded encryption, wallet notifications |
//! | `operations`   | employer / employee calls, value scaling, decryption authorization |

#[cfg(test)]
mod mocks;


#[cfg(test)]
mod operations;
