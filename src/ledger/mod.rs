pub mod client;
pub mod models;

pub use client::{LedgerQuery, LedgerSubmit, RippledClient};
pub use models::{
    AccountQueueSnapshot, GeneratedAccount, IssuedAmount, PaymentAmount, PaymentIntent,
    SubmissionOutcome,
};
