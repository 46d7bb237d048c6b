//! Chart generation and rendering for period reports.
//!
//! This module turns a [Summary] into a standalone HTML page with ECharts
//! visualizations:
//! - **Trend Chart**: income and expenses per sub-period
//! - **Category Chart**: the category breakdown as a doughnut
//!
//! Each chart is generated as JSON configuration for the ECharts library and
//! rendered with a container element and initialization script.

use charming::{
    Chart,
    component::{Axis, Grid, Legend, Title},
    element::{AxisLabel, AxisPointer, AxisPointerType, AxisType, Color, Tooltip, Trigger},
    series::{Pie, bar},
};
use maud::{DOCTYPE, Markup, PreEscaped, html};

use crate::aggregation::{Summary, ViewMode};

const ECHARTS_URL: &str = "https://cdn.jsdelivr.net/npm/echarts@5.5.1/dist/echarts.min.js";

/// A report chart with its HTML container ID and ECharts configuration.
pub struct ReportChart {
    /// The HTML element ID to use for the chart (kebab-case)
    pub id: &'static str,
    /// The ECharts configuration as a JSON string
    pub options: String,
}

/// Income and expenses for each bucket of the trend series.
pub fn trend_chart(summary: &Summary) -> Chart {
    let labels: Vec<String> = summary
        .trend
        .iter()
        .map(|bucket| bucket.label.clone())
        .collect();
    let income: Vec<f64> = summary.trend.iter().map(|bucket| bucket.income).collect();
    let expenses: Vec<f64> = summary.trend.iter().map(|bucket| bucket.expense).collect();

    Chart::new()
        .title(
            Title::new()
                .text("Income and Expenses")
                .subtext(summary.range.label.clone()),
        )
        .tooltip(
            Tooltip::new()
                .trigger(Trigger::Axis)
                .axis_pointer(AxisPointer::new().type_(AxisPointerType::Shadow)),
        )
        .legend(Legend::new().top("1%").right("4%"))
        .grid(
            Grid::new()
                .left("3%")
                .right("4%")
                .bottom("3%")
                .contain_label(true),
        )
        .x_axis(Axis::new().type_(AxisType::Category).data(labels))
        .y_axis(
            Axis::new()
                .type_(AxisType::Value)
                .axis_label(AxisLabel::new().formatter("${value}")),
        )
        .series(bar::Bar::new().name("Income").data(income))
        .series(bar::Bar::new().name("Expenses").data(expenses))
}

/// The category breakdown as a doughnut chart.
///
/// Returns `None` when there is no breakdown to show.
pub fn category_chart(summary: &Summary) -> Option<Chart> {
    if summary.category_breakdown.is_empty() {
        return None;
    }

    let title = match summary.view_mode {
        ViewMode::Income => "Income by Category",
        _ => "Expenses by Category",
    };
    let data: Vec<(f64, &str)> = summary
        .category_breakdown
        .iter()
        .map(|share| (share.value, share.label))
        .collect();
    let colors: Vec<Color> = summary
        .category_breakdown
        .iter()
        .map(|share| share.color.into())
        .collect();

    Some(
        Chart::new()
            .title(
                Title::new()
                    .text(title)
                    .subtext(summary.range.label.clone()),
            )
            .tooltip(Tooltip::new().trigger(Trigger::Item))
            .legend(Legend::new().bottom("1%"))
            .color(colors)
            .series(
                Pie::new()
                    .name(title)
                    .radius(vec!["40%", "70%"])
                    .data(data),
            ),
    )
}

/// The charts shown for `summary`.
pub fn report_charts(summary: &Summary) -> Vec<ReportChart> {
    let mut charts = vec![ReportChart {
        id: "trend-chart",
        options: trend_chart(summary).to_string(),
    }];

    if let Some(chart) = category_chart(summary) {
        charts.push(ReportChart {
            id: "category-chart",
            options: chart.to_string(),
        });
    }

    charts
}

/// Render `summary` as a standalone HTML page.
pub fn render_report(summary: &Summary) -> String {
    let charts = report_charts(summary);
    report_view(summary, &charts).into_string()
}

fn report_view(summary: &Summary, charts: &[ReportChart]) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en"
        {
            head
            {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (summary.range.label) " - Tally" }
                script src=(ECHARTS_URL) {}
            }

            body style="font-family: sans-serif; max-width: 960px; margin: 0 auto;"
            {
                h1 { (summary.range.label) }

                table id="totals"
                {
                    tr { th { "Income" } td { (format_amount(summary.total_income)) } }
                    tr { th { "Expenses" } td { (format_amount(summary.total_expense)) } }
                    tr { th { "Balance" } td { (format_amount(summary.balance)) } }
                }

                @if !summary.category_breakdown.is_empty() {
                    table id="breakdown"
                    {
                        @for share in &summary.category_breakdown {
                            tr
                            {
                                td { (share.label) }
                                td { (format_amount(share.value)) }
                                td { (format!("{:.1}%", share.percent)) }
                            }
                        }
                    }
                }

                @for chart in charts {
                    div id=(chart.id) style="width: 100%; height: 380px;" {}
                }

                script { (charts_script(charts)) }
            }
        }
    }
}

fn charts_script(charts: &[ReportChart]) -> PreEscaped<String> {
    let script_content = charts
        .iter()
        .map(|chart| {
            format!(
                r#"(function() {{
                    const chart = echarts.init(document.getElementById("{}"));
                    chart.setOption({});
                    window.addEventListener('resize', chart.resize);
                }})();"#,
                chart.id, chart.options
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    PreEscaped(format!(
        "document.addEventListener('DOMContentLoaded', function() {{\n{}\n}});",
        script_content
    ))
}

fn format_amount(amount: f64) -> String {
    format!("{amount:.2}")
}
