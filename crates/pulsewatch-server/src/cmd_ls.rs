//! `pulsewatch ls` — list clients tracked by a running server.

use pulsewatch_core::ClientSnapshot;

pub async fn cmd_ls(server: &str, json: bool) -> anyhow::Result<()> {
    let url = format!("{}/clients", server.trim_end_matches('/'));
    let response = reqwest::get(&url)
        .await
        .map_err(|e| anyhow::anyhow!("cannot reach server at {server}: {e}"))?
        .error_for_status()?;
    let clients: Vec<ClientSnapshot> = response.json().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&clients)?);
    } else {
        print!("{}", format_table(&clients));
    }
    Ok(())
}

/// Pure formatting logic for the table output, separated for testability.
pub(crate) fn format_table(clients: &[ClientSnapshot]) -> String {
    if clients.is_empty() {
        return "no clients registered\n".to_string();
    }

    let id_width = clients
        .iter()
        .map(|c| c.identity.len())
        .max()
        .unwrap_or(0)
        .max("IDENTITY".len());
    let ver_width = clients
        .iter()
        .map(|c| c.version.len())
        .max()
        .unwrap_or(0)
        .max("VERSION".len());

    let mut out = format!(
        "{:<id_width$}  {:<ver_width$}  {:<13}  {:>8}  REGISTERED\n",
        "IDENTITY", "VERSION", "STATE", "AGE"
    );
    for c in clients {
        out.push_str(&format!(
            "{:<id_width$}  {:<ver_width$}  {:<13}  {:>8}  {}\n",
            c.identity,
            c.version,
            c.state.as_str(),
            format_age(c.last_heartbeat_age_ms),
            c.registered_at.format("%Y-%m-%d %H:%M:%S"),
        ));
    }
    out
}

fn format_age(ms: u64) -> String {
    if ms < 1000 {
        format!("{ms}ms")
    } else {
        format!("{:.1}s", ms as f64 / 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use pulsewatch_core::ClientPhase;

    use super::*;

    fn snap(identity: &str, state: ClientPhase, age_ms: u64) -> ClientSnapshot {
        ClientSnapshot {
            identity: identity.to_string(),
            version: "v1".to_string(),
            state,
            registered_at: "2026-01-02T03:04:05Z".parse().expect("timestamp"),
            last_heartbeat_age_ms: age_ms,
        }
    }

    #[test]
    fn empty_table() {
        assert_eq!(format_table(&[]), "no clients registered\n");
    }

    #[test]
    fn table_rows_are_aligned() {
        let out = format_table(&[
            snap("web-01", ClientPhase::Active, 120),
            snap("batch-worker-17", ClientPhase::ShuttingDown, 4500),
        ]);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("IDENTITY         VERSION"));
        assert!(lines[1].starts_with("web-01           v1"));
        assert!(lines[1].contains("active"));
        assert!(lines[1].contains("120ms"));
        assert!(lines[2].contains("shutting_down"));
        assert!(lines[2].contains("4.5s"));
        assert!(lines[2].ends_with("2026-01-02 03:04:05"));
    }

    #[test]
    fn age_formatting() {
        assert_eq!(format_age(0), "0ms");
        assert_eq!(format_age(999), "999ms");
        assert_eq!(format_age(1000), "1.0s");
        assert_eq!(format_age(61_300), "61.3s");
    }
}
