use serde::{Deserialize, Serialize};

/// Authoritative account state fetched from the ledger node.
///
/// `queued_sequences` carries whatever the node reports for its submission
/// queue, in fetch order — callers must not assume it is sorted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountQueueSnapshot {
    pub confirmed_sequence: u32,
    pub queued_sequences: Vec<u32>,
}

/// Terminal classification of a submission attempt, derived from the node's
/// engine result code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// tesSUCCESS — applied to the current open ledger.
    Applied,
    /// terQUEUED — held by the node, will apply in a later ledger.
    Queued,
    /// tefPAST_SEQ — the sequence is already behind the account's state.
    AlreadyApplied,
    /// terPRE_SEQ — the sequence is ahead of what the node can reach.
    NotYetReachable,
    /// tecPATH_DRY — no path to the destination (trust line not set).
    PathFailure,
    /// Any other engine result code.
    Failed { code: String },
}

impl SubmissionOutcome {
    pub fn from_engine_result(code: &str) -> Self {
        match code {
            "tesSUCCESS" => SubmissionOutcome::Applied,
            "terQUEUED" => SubmissionOutcome::Queued,
            "tefPAST_SEQ" => SubmissionOutcome::AlreadyApplied,
            "terPRE_SEQ" => SubmissionOutcome::NotYetReachable,
            "tecPATH_DRY" => SubmissionOutcome::PathFailure,
            other => SubmissionOutcome::Failed {
                code: other.to_string(),
            },
        }
    }

    /// Whether the allocated sequence was consumed as intended.
    pub fn consumed_sequence(&self) -> bool {
        matches!(self, SubmissionOutcome::Applied | SubmissionOutcome::Queued)
    }
}

/// An issued-currency amount in the ledger's JSON shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedAmount {
    pub currency: String,
    pub issuer: String,
    pub value: String,
}

/// Payment amount: native drops are a bare string on the wire, issued
/// currencies an object.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum PaymentAmount {
    Drops(String),
    Issued(IssuedAmount),
}

/// Everything needed to build one payment from the funding account.
/// The allocated sequence is supplied separately, exactly once per intent.
#[derive(Debug, Clone)]
pub struct PaymentIntent {
    pub destination: String,
    pub destination_tag: Option<u32>,
    pub amount: PaymentAmount,
    pub memos: Option<Vec<serde_json::Value>>,
}

/// A freshly proposed account, not yet present on the ledger.
#[derive(Debug, Clone)]
pub struct GeneratedAccount {
    pub address: String,
    pub master_seed: String,
}

// lsfDefaultRipple on AccountRoot.Flags
pub const LSF_DEFAULT_RIPPLE: u32 = 0x0080_0000;
// asfDefaultRipple for AccountSet.SetFlag
pub const ASF_DEFAULT_RIPPLE: u32 = 8;
