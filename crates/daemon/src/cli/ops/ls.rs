use std::fmt;

use clap::Args;
use comfy_table::Table;
use owo_colors::OwoColorize;

use common::catalog::FileDescriptor;
use relay_daemon::http_server::api::client::ApiError;
use relay_daemon::http_server::api::{ListFilesRequest, ListFilesResponse};

/// List local files and what has been uploaded
#[derive(Args, Debug, Clone)]
pub struct Ls {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug)]
pub struct LsOutput {
    pub files: Vec<FileDescriptor>,
    pub json: bool,
}

impl fmt::Display for LsOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.json {
            let json = serde_json::to_string_pretty(&self.files).map_err(|_| fmt::Error)?;
            return write!(f, "{json}");
        }
        if self.files.is_empty() {
            return write!(f, "No files found");
        }

        let mut table = Table::new();
        table.set_header(vec!["NAME", "SIZE", "STATUS", "PATH"]);
        for file in &self.files {
            let status = match &file.upload_id {
                Some(id) => format!("{} {}", "uploaded".green(), id),
                None if file.progress > 0.0 => {
                    format!("{:.0}%", file.progress).yellow().to_string()
                }
                None => "local".dimmed().to_string(),
            };
            table.add_row(vec![
                file.name.clone(),
                file.size.to_string(),
                status,
                file.path.clone(),
            ]);
        }
        write!(f, "{table}")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LsError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Ls {
    type Error = LsError;
    type Output = LsOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut client = ctx.client.clone();
        let files: ListFilesResponse = client.call(ListFilesRequest {}).await?;

        Ok(LsOutput {
            files,
            json: self.json,
        })
    }
}
