use std::path::Path;

use costcalc_core::config::LoadOptions;
use costcalc_core::{format_currency, Evaluation, LineItem};

use crate::commands::{describe_report, open_calculator, read_configuration, CommandResult};

pub fn run(options: &LoadOptions, file: &Path, json: bool) -> CommandResult {
    let (_, mut calculator) = match open_calculator("summary", options) {
        Ok(opened) => opened,
        Err(failure) => return failure,
    };
    let report = match read_configuration("summary", &mut calculator, file) {
        Ok(report) => report,
        Err(failure) => return failure,
    };

    let evaluation = calculator.evaluate();
    if json {
        return CommandResult::document("summary", &evaluation);
    }

    let mut message = render(&evaluation);
    if let Some(note) = describe_report(&report) {
        message.push('\n');
        message.push_str(&note);
    }
    CommandResult::success("summary", message)
}

pub fn render(evaluation: &Evaluation) -> String {
    let summary = &evaluation.summary;
    let total = format_currency(summary.total_cost);
    let mut lines = vec![format!("Estimated monthly cost: {total}")];

    if summary.categories.is_empty() {
        lines.push("No services configured yet.".to_string());
    }
    for category in &summary.categories {
        lines.push(format!("{}: {}", category.category, format_currency(category.cost)));
        lines.extend(category.items.iter().map(render_item));
    }

    if !evaluation.recommendations.is_empty() {
        lines.push("Recommendations:".to_string());
    }
    for recommendation in &evaluation.recommendations {
        lines.push(format!("  {} {}", recommendation.icon, recommendation.message));
        lines.extend(recommendation.suggestions.iter().map(|tip| format!("     - {tip}")));
    }

    lines.join("\n")
}

fn render_item(item: &LineItem) -> String {
    match item.unit_price {
        Some(price) => format!(
            "  - {}: {} x {} = {}",
            item.name,
            item.quantity_display,
            format_currency(price),
            format_currency(item.cost)
        ),
        None => format!(
            "  - {}: {} = {}",
            item.name,
            item.quantity_display,
            format_currency(item.cost)
        ),
    }
}

#[cfg(test)]
mod tests {
    use costcalc_core::{Calculator, PricingCatalog};

    use super::render;

    #[test]
    fn empty_configuration_renders_zero_total() {
        let calculator = Calculator::new(PricingCatalog::builtin().expect("catalog"));
        let text = render(&calculator.evaluate());

        assert_eq!(text, "Estimated monthly cost: $0.00\nNo services configured yet.");
    }

    #[test]
    fn breakdown_lists_items_and_recommendations() {
        let mut calculator = Calculator::new(PricingCatalog::builtin().expect("catalog"));
        calculator.set_option_quantity("Metrics", 0, "1,500").expect("metrics");
        calculator.set_option_quantity("Kubernetes Monitoring - Host", 0, "2").expect("hosts");

        let text = render(&calculator.evaluate());

        assert!(text.starts_with("Estimated monthly cost: $34.90"));
        assert!(text.contains("Metrics: $13.00"));
        assert!(text.contains("1,500 (2 packs of 1,000) x $6.50 = $13.00"));
        assert!(text.contains("Recommendations:\n  ℹ️ Kubernetes monitoring configured"));
    }
}
