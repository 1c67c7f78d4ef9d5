//! Tool catalog: the operations a job can request

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tool category, as grouped in the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolCategory {
    Convert,
    Organize,
    Security,
}

/// Format of the file handed to the user on download
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Docx,
    Xlsx,
    Pptx,
    Pdf,
}

impl OutputFormat {
    /// File extension without the leading dot
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Docx => "docx",
            OutputFormat::Xlsx => "xlsx",
            OutputFormat::Pptx => "pptx",
            OutputFormat::Pdf => "pdf",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            OutputFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            OutputFormat::Pptx => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
            OutputFormat::Pdf => "application/pdf",
        }
    }
}

/// Operation selector sent with an upload.
///
/// Identifiers outside the catalog are kept verbatim in `Other` so the job
/// can be recorded; the pipeline rejects them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ToolType {
    PdfToWord,
    PdfToExcel,
    PdfToPowerpoint,
    WordToPdf,
    MergePdf,
    SplitPdf,
    CompressPdf,
    EditPdf,
    ProtectPdf,
    UnlockPdf,
    SignPdf,
    WatermarkPdf,
    Other(String),
}

impl ToolType {
    /// Every supported tool, in catalog order
    pub const CATALOG: [ToolType; 12] = [
        ToolType::PdfToWord,
        ToolType::PdfToExcel,
        ToolType::PdfToPowerpoint,
        ToolType::WordToPdf,
        ToolType::MergePdf,
        ToolType::SplitPdf,
        ToolType::CompressPdf,
        ToolType::EditPdf,
        ToolType::ProtectPdf,
        ToolType::UnlockPdf,
        ToolType::SignPdf,
        ToolType::WatermarkPdf,
    ];

    /// Wire identifier, e.g. `pdf-to-word`
    pub fn as_str(&self) -> &str {
        match self {
            ToolType::PdfToWord => "pdf-to-word",
            ToolType::PdfToExcel => "pdf-to-excel",
            ToolType::PdfToPowerpoint => "pdf-to-powerpoint",
            ToolType::WordToPdf => "word-to-pdf",
            ToolType::MergePdf => "merge-pdf",
            ToolType::SplitPdf => "split-pdf",
            ToolType::CompressPdf => "compress-pdf",
            ToolType::EditPdf => "edit-pdf",
            ToolType::ProtectPdf => "protect-pdf",
            ToolType::UnlockPdf => "unlock-pdf",
            ToolType::SignPdf => "sign-pdf",
            ToolType::WatermarkPdf => "watermark-pdf",
            ToolType::Other(id) => id,
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, ToolType::Other(_))
    }

    /// Human-readable tool name
    pub fn display_name(&self) -> &str {
        match self {
            ToolType::PdfToWord => "PDF to Word",
            ToolType::PdfToExcel => "PDF to Excel",
            ToolType::PdfToPowerpoint => "PDF to PowerPoint",
            ToolType::WordToPdf => "Word to PDF",
            ToolType::MergePdf => "Merge PDF",
            ToolType::SplitPdf => "Split PDF",
            ToolType::CompressPdf => "Compress PDF",
            ToolType::EditPdf => "Edit PDF",
            ToolType::ProtectPdf => "Protect PDF",
            ToolType::UnlockPdf => "Unlock PDF",
            ToolType::SignPdf => "Sign PDF",
            ToolType::WatermarkPdf => "Watermark PDF",
            ToolType::Other(id) => id,
        }
    }

    pub fn category(&self) -> Option<ToolCategory> {
        match self {
            ToolType::PdfToWord
            | ToolType::PdfToExcel
            | ToolType::PdfToPowerpoint
            | ToolType::WordToPdf => Some(ToolCategory::Convert),
            ToolType::MergePdf
            | ToolType::SplitPdf
            | ToolType::CompressPdf
            | ToolType::EditPdf => Some(ToolCategory::Organize),
            ToolType::ProtectPdf
            | ToolType::UnlockPdf
            | ToolType::SignPdf
            | ToolType::WatermarkPdf => Some(ToolCategory::Security),
            ToolType::Other(_) => None,
        }
    }

    /// Format the download is labelled with.
    ///
    /// Only `pdf-to-word` actually produces that format; the other
    /// extraction tools still hand back the placeholder copy.
    pub fn download_format(&self) -> OutputFormat {
        match self {
            ToolType::PdfToWord => OutputFormat::Docx,
            ToolType::PdfToExcel => OutputFormat::Xlsx,
            ToolType::PdfToPowerpoint => OutputFormat::Pptx,
            _ => OutputFormat::Pdf,
        }
    }

    /// Label for the download action in clients
    pub fn download_label(&self) -> &'static str {
        match self {
            ToolType::PdfToWord => "Convert to Word",
            ToolType::PdfToExcel => "Convert to Excel",
            ToolType::PdfToPowerpoint => "Convert to PowerPoint",
            ToolType::WordToPdf => "Convert to PDF",
            ToolType::MergePdf => "Download Merged",
            ToolType::SplitPdf => "Download Split",
            ToolType::CompressPdf => "Download Compressed",
            ToolType::EditPdf => "Download Edited",
            ToolType::ProtectPdf => "Download Protected",
            ToolType::UnlockPdf => "Download Unlocked",
            ToolType::SignPdf => "Download Signed",
            ToolType::WatermarkPdf => "Download Watermarked",
            ToolType::Other(_) => "Download",
        }
    }
}

impl From<String> for ToolType {
    fn from(value: String) -> Self {
        ToolType::CATALOG
            .iter()
            .find(|tool| tool.as_str() == value)
            .cloned()
            .unwrap_or(ToolType::Other(value))
    }
}

impl From<&str> for ToolType {
    fn from(value: &str) -> Self {
        ToolType::from(value.to_string())
    }
}

impl From<ToolType> for String {
    fn from(value: ToolType) -> Self {
        match value {
            ToolType::Other(id) => id,
            tool => tool.as_str().to_string(),
        }
    }
}

impl fmt::Display for ToolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Catalog entry as exposed by `GET /api/tools`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInfo {
    pub id: ToolType,
    pub name: String,
    pub category: Option<ToolCategory>,
    pub download_extension: String,
    pub content_type: String,
}

impl From<&ToolType> for ToolInfo {
    fn from(tool: &ToolType) -> Self {
        let format = tool.download_format();
        Self {
            id: tool.clone(),
            name: tool.display_name().to_string(),
            category: tool.category(),
            download_extension: format.extension().to_string(),
            content_type: format.content_type().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_ids_parse_back() {
        for tool in ToolType::CATALOG.iter() {
            assert_eq!(&ToolType::from(tool.as_str()), tool);
            assert!(tool.is_supported());
            assert!(tool.category().is_some());
        }
    }

    #[test]
    fn test_unknown_tool_is_preserved() {
        let tool = ToolType::from("unknown-tool");
        assert_eq!(tool, ToolType::Other("unknown-tool".to_string()));
        assert!(!tool.is_supported());
        assert_eq!(serde_json::to_string(&tool).unwrap(), "\"unknown-tool\"");
    }

    #[test]
    fn test_download_formats() {
        assert_eq!(ToolType::PdfToWord.download_format(), OutputFormat::Docx);
        assert_eq!(ToolType::PdfToExcel.download_format().extension(), "xlsx");
        assert_eq!(ToolType::PdfToPowerpoint.download_format().extension(), "pptx");
        assert_eq!(ToolType::WordToPdf.download_format(), OutputFormat::Pdf);
        assert_eq!(ToolType::MergePdf.download_format().content_type(), "application/pdf");
    }

    #[test]
    fn test_serde_uses_wire_ids() {
        let tool: ToolType = serde_json::from_str("\"merge-pdf\"").unwrap();
        assert_eq!(tool, ToolType::MergePdf);
        assert_eq!(serde_json::to_string(&ToolType::SignPdf).unwrap(), "\"sign-pdf\"");
    }
}
