use serde::{Deserialize, Serialize};

/// The documents a shipment needs, each produced by one generation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DocumentKind {
    Labels,
    CustomsInvoice,
    PaperlessTradeInvoice,
    Receipt,
    CombinedDocument,
}

impl DocumentKind {
    /// Suffix used in the document's storage name.
    pub fn suffix(&self) -> &'static str {
        match self {
            DocumentKind::Labels => "labels",
            DocumentKind::CustomsInvoice => "invoice",
            DocumentKind::PaperlessTradeInvoice => "pt_invoice",
            DocumentKind::Receipt => "receipt",
            DocumentKind::CombinedDocument => "combined_document",
        }
    }

    /// Journal stage name of the step generating this document.
    pub fn step_name(&self) -> &'static str {
        match self {
            DocumentKind::Labels => "generate-labels",
            DocumentKind::CustomsInvoice => "generate-customs-invoice",
            DocumentKind::PaperlessTradeInvoice => "generate-paperless-trade-invoice",
            DocumentKind::Receipt => "generate-receipt",
            DocumentKind::CombinedDocument => "generate-combined-document",
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.suffix())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentDocuments {
    pub labels_url: String,
    /// Absent for domestic shipments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_url: Option<String>,
    pub receipt_url: String,
    pub combined_document_url: String,
}

/// Output of the paperless-trade child process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperlessTradeDocuments {
    pub invoice_url: String,
}
