use crate::cli::output::{output_error, output_value};
use crate::cli::OutputFormat;
use crate::route::Menu;
use crate::shell::Shell;

pub async fn handle(shell: &Shell, output_format: OutputFormat) -> anyhow::Result<()> {
    let Some(user) = shell.auth().user_info() else {
        return output_error(output_format, "Not logged in", Some("NO_SESSION"));
    };

    if let Err(e) = shell.routes().init_auth_route(&user).await {
        return output_error(output_format, &e.to_string(), Some("ROUTE_INIT_FAILED"));
    }

    let menus = shell.menus();
    output_value(output_format, &menus, || render_menus(&menus, 0))
}

fn render_menus(menus: &[Menu], depth: usize) -> String {
    let mut out = String::new();
    for menu in menus {
        out.push_str(&format!(
            "{}{} ({})\n",
            "  ".repeat(depth),
            menu.label,
            menu.route_path
        ));
        if !menu.children.is_empty() {
            out.push_str(&render_menus(&menu.children, depth + 1));
        }
    }
    out.trim_end().to_string()
}
