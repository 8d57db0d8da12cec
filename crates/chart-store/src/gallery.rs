use forecast_core::{format_years, ChartEntry};

use crate::render::html_escape;

/// Builds the gallery index page: charts grouped by years of history, then
/// forecast horizon, with a delete button per entry.
pub(crate) fn build_index(entries: &[ChartEntry]) -> String {
    // years label -> horizon -> entries. Grouping on the rendered label
    // keeps values that display identically in one section regardless of
    // float noise in the manifests.
    let mut groups: Vec<(String, f64, Vec<(u32, Vec<&ChartEntry>)>)> = Vec::new();

    for entry in entries {
        let years = entry.metadata.years_history;
        let label = format_years(years);
        let year_group = match groups.iter_mut().find(|(l, _, _)| *l == label) {
            Some(g) => g,
            None => {
                groups.push((label, years, Vec::new()));
                groups.last_mut().unwrap()
            }
        };

        let days = entry.metadata.horizon_days;
        match year_group.2.iter_mut().find(|(d, _)| *d == days) {
            Some((_, list)) => list.push(entry),
            None => year_group.2.push((days, vec![entry])),
        }
    }

    groups.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut body = vec!["  <h1>All Saved Charts</h1>".to_string()];
    for (label, _, mut by_days) in groups {
        body.push(format!("  <h2>{} years of history</h2>", label));
        by_days.sort_by(|a, b| b.0.cmp(&a.0));

        for (days, mut list) in by_days {
            body.push(format!("    <h3>Forecast horizon: {} days</h3>", days));
            body.push("    <ul>".to_string());
            list.sort_by(|a, b| a.filename.cmp(&b.filename));

            for entry in list {
                let display = entry.filename.trim_end_matches(".html");
                body.push(format!(
                    "      <li style=\"margin-bottom:15px;\"><a href=\"{href}\">{name}</a> \
                     <button onclick=\"deleteChart('{href}')\">Delete</button></li>",
                    href = html_escape(&entry.filename),
                    name = html_escape(display),
                ));
            }
            body.push("    </ul>".to_string());
        }
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Chart Index</title>
  <style>
    body {{ font-family: Arial, sans-serif; margin: 40px; }}
    h1 {{ font-size: 2em; margin-bottom: 20px; }}
    h2 {{ margin-top: 30px; color: #333; }}
    h3 {{ margin-left: 10px; color: #555; }}
    ul {{ list-style-type: none; padding-left: 20px; }}
    li a {{ color: #1a73e8; text-decoration: none; }}
    li a:hover {{ text-decoration: underline; }}
    button {{ margin-left: 10px; }}
  </style>
</head>
<body>
{body}
<script>
function deleteChart(fname) {{
  fetch('/api/charts/delete', {{
    method: 'POST',
    headers: {{ 'Content-Type': 'application/json' }},
    body: JSON.stringify({{ filename: fname }})
  }})
  .then(r => r.json())
  .then(j => {{
    if (j.success) location.reload();
    else alert('Delete failed for ' + fname);
  }});
}}
</script>
</body>
</html>
"#,
        body = body.join("\n")
    )
}
