use serde_json::json;

use crate::cli::output::{output_success, output_value};
use crate::cli::OutputFormat;
use crate::shell::{Navigation, Shell};

pub async fn handle(shell: &Shell, path: &str, output_format: OutputFormat) -> anyhow::Result<()> {
    match shell.navigate(path).await {
        Navigation::Allowed(route) => {
            let breadcrumbs: Vec<String> = shell
                .breadcrumbs()
                .iter()
                .map(|c| c.label.clone())
                .collect();

            output_value(
                output_format,
                &json!({
                    "requested": path,
                    "landed_on": route.full_path,
                    "route": route.name,
                    "breadcrumbs": breadcrumbs,
                }),
                || {
                    format!(
                        "{} -> {} ({})",
                        path,
                        route.full_path,
                        route.name.as_deref().unwrap_or("-")
                    )
                },
            )
        }
        Navigation::Blocked => output_success(
            output_format,
            &format!("Navigation to '{}' was blocked", path),
            Some(json!({ "requested": path, "blocked": true })),
        ),
    }
}
