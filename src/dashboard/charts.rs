//! Pie charts summarising the transactions of the selected day.
//!
//! Each chart is generated as an ECharts option object with charming and
//! initialised by an inline script, so that the charts are drawn again when
//! htmx swaps in the content for another date.

use charming::{
    Chart,
    component::{Legend, Title},
    element::{Tooltip, Trigger},
    series::Pie,
};
use maud::{Markup, PreEscaped, html};

use crate::{
    deadletter::{ActionMap, ChartDatum, TransactionField, aggregate_by, group_actions_by_kind},
    watchdog::Transaction,
};

/// A dashboard chart with its HTML container ID and ECharts configuration.
pub(super) struct DashboardChart {
    /// The HTML element ID to use for the chart (kebab-case)
    pub id: &'static str,
    /// The ECharts configuration as a JSON string
    pub options: String,
}

/// Build the four charts shown for a day: the e-commerce status, the payment
/// gateway status, the payment method and the action status of the transactions.
pub(super) fn build_dashboard_charts(
    transactions: &[Transaction],
    action_map: &ActionMap,
) -> [DashboardChart; 4] {
    [
        DashboardChart {
            id: "ecommerce-status-chart",
            options: pie_chart(
                "Stato Ecommerce",
                &aggregate_by(transactions, TransactionField::ECommerceStatus),
            )
            .to_string(),
        },
        DashboardChart {
            id: "gateway-status-chart",
            options: pie_chart(
                "Stato NPG",
                &aggregate_by(transactions, TransactionField::GatewayAuthorizationStatus),
            )
            .to_string(),
        },
        DashboardChart {
            id: "payment-method-chart",
            options: pie_chart(
                "Metodi di pagamento",
                &aggregate_by(transactions, TransactionField::PaymentMethodName),
            )
            .to_string(),
        },
        DashboardChart {
            id: "action-status-chart",
            options: pie_chart("Stato azioni", &group_actions_by_kind(action_map)).to_string(),
        },
    ]
}

fn pie_chart(title: &str, data: &[ChartDatum]) -> Chart {
    let data: Vec<(f64, &str)> = data
        .iter()
        .map(|datum| (datum.value as f64, datum.name.as_str()))
        .collect();

    Chart::new()
        .title(Title::new().text(title).left("center"))
        .tooltip(Tooltip::new().trigger(Trigger::Item))
        .legend(Legend::new().left("center").top("bottom"))
        .series(
            Pie::new()
                .name(title)
                .radius(vec!["40%", "70%"])
                .data(data),
        )
}

/// Renders the HTML containers for the charts followed by the script that draws them.
pub(super) fn charts_view(charts: &[DashboardChart]) -> Markup {
    html!(
        section
            id="charts"
            class="w-full mx-auto mb-4"
        {
            div class="grid grid-cols-1 md:grid-cols-2 xl:grid-cols-4 gap-4"
            {
                @for chart in charts {
                    div
                        id=(chart.id)
                        class="min-h-[320px] rounded dark:bg-gray-100"
                    {}
                }
            }
        }

        script { (charts_script(charts)) }
    )
}

/// Generates JavaScript initialization code for the charts.
///
/// Each chart follows the colour scheme of the browser and is resized with the window.
fn charts_script(charts: &[DashboardChart]) -> PreEscaped<String> {
    let script_content = charts
        .iter()
        .map(|chart| {
            format!(
                r#"(function() {{
                    const chartDom = document.getElementById("{}");
                    const chart = echarts.init(chartDom);
                    const option = {};
                    chart.setOption(option);

                    window.addEventListener('resize', chart.resize);

                    const darkModeMediaQuery = window.matchMedia('(prefers-color-scheme: dark)');
                    const updateTheme = () => {{
                        const isDarkMode = darkModeMediaQuery.matches;
                        chart.setTheme(isDarkMode ? 'dark' : 'default');
                    }}
                    darkModeMediaQuery.addEventListener('change', updateTheme);
                    updateTheme();
                }})();"#,
                chart.id, chart.options
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    PreEscaped(script_content)
}
