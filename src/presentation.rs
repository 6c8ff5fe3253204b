//! HTML pages for the browser-facing routes.
//!
//! The page layer only lays out a [`PageContext`]; it never scores anything.

use crate::features::RAW_FIELDS;
use crate::prediction_service::{PageContext, PredictionResult};
use std::fmt::Write;

const HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Forest Fire Risk</title>
<style>
body { font-family: sans-serif; max-width: 48rem; margin: 2rem auto; padding: 0 1rem; }
.panel { border-radius: 6px; padding: 1rem; margin: 1rem 0; }
.success { background: #d1e7dd; } .warning { background: #fff3cd; } .danger { background: #f8d7da; }
.error { background: #f8d7da; border: 1px solid #dc3545; }
label { display: block; margin-top: .5rem; }
table { border-collapse: collapse; } td, th { padding: .25rem .75rem; text-align: left; }
</style>
</head>
<body>
<nav><a href="/">Predict</a> | <a href="/about">About</a></nav>
"#;

const FOOT: &str = "</body>\n</html>\n";

/// Escape text for inclusion in HTML element content or attribute values.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn field_label(name: &str) -> &'static str {
    match name {
        "temperature" => "Temperature (°C)",
        "wind_speed" => "Wind speed (km/h)",
        "humidity" => "Relative humidity (%)",
        "FFMC" => "Fine Fuel Moisture Code (FFMC)",
        "DMC" => "Duff Moisture Code (DMC)",
        "DC" => "Drought Code (DC)",
        _ => "",
    }
}

fn render_form(out: &mut String) {
    out.push_str("<h1>Forest Fire Risk Prediction</h1>\n<form method=\"post\" action=\"/predict\">\n");
    for name in RAW_FIELDS {
        let _ = writeln!(
            out,
            "<label for=\"{name}\">{}</label><input id=\"{name}\" name=\"{name}\" type=\"number\" step=\"any\" required>",
            field_label(name)
        );
    }
    out.push_str("<p><button type=\"submit\">Predict</button></p>\n</form>\n");
}

fn render_prediction(out: &mut String, p: &PredictionResult) {
    let _ = writeln!(
        out,
        "<section class=\"panel {}\"><h2>{}</h2><p>Fire probability: {}%</p></section>",
        p.risk_color, p.risk_label, p.probability_percent
    );

    out.push_str("<h3>Fire behavior</h3>\n<ul>\n");
    let _ = writeln!(out, "<li>Spread rate: {}</li>", p.fire_metrics.spread_rate);
    let _ = writeln!(out, "<li>Intensity: {}</li>", p.fire_metrics.intensity);
    let _ = writeln!(out, "<li>Flame height: {}</li>", p.fire_metrics.flame_height);
    out.push_str("</ul>\n");

    out.push_str("<h3>Feature importance</h3>\n<table>\n<tr><th>Feature</th><th>Importance</th></tr>\n");
    for e in &p.explanations {
        let _ = writeln!(
            out,
            "<tr><td>{}</td><td>{}</td></tr>",
            escape_html(&e.name),
            e.importance
        );
    }
    out.push_str("</table>\n");

    out.push_str("<h3>Inputs</h3>\n<table>\n");
    for v in &p.input_values {
        let _ = writeln!(out, "<tr><td>{}</td><td>{}</td></tr>", escape_html(&v.name), v.value);
    }
    out.push_str("</table>\n");
}

/// Main page: the input form, followed by results or an error panel.
pub fn render_index(ctx: &PageContext) -> String {
    let mut out = String::from(HEAD);
    render_form(&mut out);

    if let Some(error) = &ctx.error {
        let _ = writeln!(
            out,
            "<section class=\"panel error\" id=\"error\">{}</section>",
            escape_html(error)
        );
    }
    if ctx.show_results {
        if let Some(prediction) = &ctx.prediction {
            out.push_str("<div id=\"results\">\n");
            render_prediction(&mut out, prediction);
            out.push_str("</div>\n");
        }
    }

    out.push_str(FOOT);
    out
}

pub fn render_about() -> String {
    let mut out = String::from(HEAD);
    out.push_str(
        "<h1>About</h1>\n\
         <p>This service estimates the probability of a forest fire from current weather \
         and Fire Weather Index components. The Initial Spread Index (ISI), Buildup Index (BUI) \
         and Fire Weather Index (FWI) are computed from the submitted values before scoring.</p>\n\
         <p>Risk is reported as Low below 30%, Medium from 30% to below 70%, and High from 70%. \
         Fire behavior figures are illustrative and not a physical spread model.</p>\n",
    );
    out.push_str(FOOT);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_are_escaped() {
        let page = render_index(&PageContext::error("<script>alert(1)</script>"));
        assert!(page.contains("&lt;script&gt;"));
        assert!(!page.contains("<script>alert"));
        assert!(!page.contains("id=\"results\""));
    }

    #[test]
    fn empty_context_renders_only_the_form() {
        let page = render_index(&PageContext::default());
        assert!(page.contains("name=\"FFMC\""));
        assert!(!page.contains("id=\"error\""));
    }
}
