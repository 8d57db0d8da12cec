use forecast_core::{ChartArtifact, ChartMetadata, ForecastError, ForecastResult};

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.32.0.min.js";

/// Renders a forecast into a self-contained interactive Plotly page:
/// actual closes, predicted line, and a filled confidence band.
pub(crate) fn render_chart(
    result: &ForecastResult,
    metadata: &ChartMetadata,
) -> Result<ChartArtifact, ForecastError> {
    let last_forecast = result
        .last_forecast_date()
        .ok_or_else(|| ForecastError::ChartStore("forecast has no points".to_string()))?;

    let hist_dates: Vec<String> = result
        .history
        .dates()
        .iter()
        .map(|d| d.format("%Y-%m-%d").to_string())
        .collect();
    let hist_closes = result.history.closes();

    let fc_dates: Vec<String> = result
        .forecast
        .iter()
        .map(|p| p.date.format("%Y-%m-%d").to_string())
        .collect();
    let predicted: Vec<f64> = result.forecast.iter().map(|p| p.predicted).collect();
    let upper: Vec<f64> = result.forecast.iter().map(|p| p.upper).collect();
    let lower: Vec<f64> = result.forecast.iter().map(|p| p.lower).collect();

    let html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>{title}</title>
  <script src="{cdn}"></script>
</head>
<body>
  <div id="chart" style="width:100%;height:92vh;"></div>
  <script>
    const traces = [
      {{
        x: {hist_x}, y: {hist_y},
        mode: 'lines', name: 'Actual Stock Price',
        line: {{ color: 'blue', width: 2 }}
      }},
      {{
        x: {fc_x}, y: {fc_y},
        mode: 'lines', name: 'Predicted Stock Price',
        line: {{ color: 'red', width: 2 }}
      }},
      {{
        x: {fc_x}, y: {fc_upper},
        mode: 'lines', line: {{ color: 'rgba(0,0,0,0)' }},
        showlegend: false
      }},
      {{
        x: {fc_x}, y: {fc_lower},
        mode: 'lines', line: {{ color: 'rgba(0,0,0,0)' }},
        fill: 'tonexty', name: 'Confidence Interval',
        fillcolor: 'rgba(255,0,0,0.1)'
      }}
    ];
    Plotly.newPlot('chart', traces, {{
      title: {title_json},
      xaxis: {{ title: 'Date' }},
      yaxis: {{ title: 'Stock Price ($)' }},
      hovermode: 'x',
      template: 'plotly_white'
    }});
  </script>
</body>
</html>
"#,
        title = html_escape(&metadata.title),
        title_json = json(&metadata.title)?,
        cdn = PLOTLY_CDN,
        hist_x = json(&hist_dates)?,
        hist_y = json(&hist_closes)?,
        fc_x = json(&fc_dates)?,
        fc_y = json(&predicted)?,
        fc_upper = json(&upper)?,
        fc_lower = json(&lower)?,
    );

    Ok(ChartArtifact {
        html,
        filename_stem: format!(
            "{}, until {}",
            result.symbol,
            last_forecast.format("%B %-d, %Y")
        ),
    })
}

fn json<T: serde::Serialize>(value: &T) -> Result<String, ForecastError> {
    serde_json::to_string(value).map_err(|e| ForecastError::ChartStore(e.to_string()))
}

pub(crate) fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
