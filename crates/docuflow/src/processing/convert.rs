//! Tool dispatch: turns a staging file into an output file
//!
//! Conversions are placeholders. `pdf-to-word` writes a Word document
//! describing the input; every other catalog tool copies the input as-is.

use chrono::Utc;
use docx_rs::{Docx, Paragraph, Run};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::ToolType;

/// One conversion to perform
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub job_id: Uuid,
    pub tool_type: ToolType,
    pub input_path: PathBuf,
    /// Name the user uploaded the file under
    pub file_name: String,
}

/// Extension of the file the pipeline writes for a tool
fn produced_extension(tool: &ToolType) -> &'static str {
    match tool {
        ToolType::PdfToWord => "docx",
        _ => "pdf",
    }
}

/// Output path derived from job id and the current time
pub fn output_path_for(output_dir: &Path, job_id: Uuid, tool: &ToolType) -> PathBuf {
    output_dir.join(format!(
        "processed_{}_{}.{}",
        job_id,
        Utc::now().timestamp_millis(),
        produced_extension(tool)
    ))
}

/// Run the tool and return the path of the written output file
pub async fn convert(request: &ConversionRequest, output_dir: &Path) -> Result<PathBuf> {
    if !request.tool_type.is_supported() {
        return Err(Error::UnsupportedTool(request.tool_type.to_string()));
    }

    let output_path = output_path_for(output_dir, request.job_id, &request.tool_type);

    tracing::debug!(
        "Converting {} with {}: {} -> {}",
        request.file_name,
        request.tool_type,
        request.input_path.display(),
        output_path.display()
    );

    match request.tool_type {
        ToolType::PdfToWord => write_word_placeholder(request, &output_path).await?,
        _ => {
            tokio::fs::copy(&request.input_path, &output_path).await?;
        }
    }

    Ok(output_path)
}

async fn write_word_placeholder(request: &ConversionRequest, output_path: &Path) -> Result<()> {
    let metadata = tokio::fs::metadata(&request.input_path).await?;
    let size_kb = metadata.len() as f64 / 1024.0;
    let now = Utc::now();

    let text = format!(
        "Document Conversion Results\n\
         Original PDF File: {name}\n\
         File Size: {size:.2} KB\n\
         Conversion Date: {date}\n\
         Conversion Time: {time}\n\
         This is a converted document from PDF to Word format.\n\
         Note: This is a demonstration conversion. A production converter would place the text extracted from your PDF here.\n\
         Supported tools: {tools}\n\
         Your document has been processed successfully.",
        name = request.file_name,
        size = size_kb,
        date = now.format("%Y-%m-%d"),
        time = now.format("%H:%M:%S UTC"),
        tools = ToolType::CATALOG
            .iter()
            .map(|t| t.display_name())
            .collect::<Vec<_>>()
            .join(", "),
    );

    let bytes = build_docx(&text)?;
    tokio::fs::write(output_path, bytes).await?;

    tracing::debug!("Word document written: {}", output_path.display());
    Ok(())
}

/// One paragraph per non-empty line
fn build_docx(text: &str) -> Result<Vec<u8>> {
    let docx = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .fold(Docx::new(), |docx, line| {
            docx.add_paragraph(Paragraph::new().add_run(Run::new().add_text(line)))
        });

    let mut buffer = Cursor::new(Vec::new());
    docx.build()
        .pack(&mut buffer)
        .map_err(|e| Error::internal(format!("Failed to write Word document: {}", e)))?;

    Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docx_text(data: &[u8]) -> Vec<String> {
        let doc = docx_rs::read_docx(data).unwrap();
        let mut lines = Vec::new();
        for child in doc.document.children {
            if let docx_rs::DocumentChild::Paragraph(p) = child {
                let mut line = String::new();
                for child in p.children {
                    if let docx_rs::ParagraphChild::Run(run) = child {
                        for child in run.children {
                            if let docx_rs::RunChild::Text(t) = child {
                                line.push_str(&t.text);
                            }
                        }
                    }
                }
                lines.push(line);
            }
        }
        lines
    }

    fn request(dir: &Path, tool: ToolType) -> ConversionRequest {
        let input_path = dir.join("staged");
        std::fs::write(&input_path, b"%PDF-1.4\nhello world\n%%EOF").unwrap();
        ConversionRequest {
            job_id: Uuid::new_v4(),
            tool_type: tool,
            input_path,
            file_name: "report.pdf".to_string(),
        }
    }

    #[tokio::test]
    async fn test_copy_tools_are_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let req = request(dir.path(), ToolType::MergePdf);

        let output = convert(&req, dir.path()).await.unwrap();
        assert_eq!(output.extension().unwrap(), "pdf");
        assert!(output
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(&format!("processed_{}_", req.job_id)));
        assert_eq!(std::fs::read(&output).unwrap(), std::fs::read(&req.input_path).unwrap());
    }

    #[tokio::test]
    async fn test_pdf_to_word_writes_docx() {
        let dir = tempfile::tempdir().unwrap();
        let req = request(dir.path(), ToolType::PdfToWord);

        let output = convert(&req, dir.path()).await.unwrap();
        assert_eq!(output.extension().unwrap(), "docx");

        let bytes = std::fs::read(&output).unwrap();
        assert_eq!(&bytes[..2], b"PK");

        let lines = docx_text(&bytes);
        assert_eq!(lines[0], "Document Conversion Results");
        assert!(lines.iter().any(|l| l == "Original PDF File: report.pdf"));
        assert!(lines.iter().any(|l| l.starts_with("File Size: 0.03 KB")));
    }

    #[tokio::test]
    async fn test_unknown_tool_fails_without_output() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("out");
        std::fs::create_dir(&out_dir).unwrap();
        let req = request(dir.path(), ToolType::from("unknown-tool"));

        let err = convert(&req, &out_dir).await.unwrap_err();
        assert!(matches!(err, Error::UnsupportedTool(ref t) if t == "unknown-tool"));
        assert_eq!(std::fs::read_dir(&out_dir).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_missing_input_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let req = ConversionRequest {
            job_id: Uuid::new_v4(),
            tool_type: ToolType::CompressPdf,
            input_path: dir.path().join("gone"),
            file_name: "gone.pdf".to_string(),
        };

        assert!(matches!(convert(&req, dir.path()).await, Err(Error::Io(_))));
    }
}
