//! Auto-generated insight sentences: a fixed, ordered rule table evaluated
//! against the filtered view. Each rule is capability-gated and emits at
//! most one statement; output order is evaluation order.

use color_eyre::Result;
use polars::prelude::*;

use crate::aggregate::{record_margins, top_n};
use crate::caps::ColumnCaps;
use crate::dataset::columns;
use crate::filter::FilteredView;
use crate::stats::{paired_values, pearson_correlation, skewness};

/// Correlation above this reads as a strong positive relationship.
pub const CORR_STRONG: f64 = 0.4;
/// Correlation below this reads as a negative relationship.
pub const CORR_NEGATIVE: f64 = -0.3;
/// Margin skewness above this reads as right-skewed.
pub const SKEW_RIGHT: f64 = 1.0;

/// Which rule produced a statement. Useful for tests and export grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsightRule {
    Correlation,
    DominantCategory,
    MarginSkew,
    TopCustomer,
    TemporalVariation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsightStatement {
    pub rule: InsightRule,
    pub text: String,
}

/// Evaluate all rules in their fixed order. Rules whose columns are absent
/// are skipped, never errors.
pub fn generate_insights(view: &FilteredView, caps: &ColumnCaps) -> Result<Vec<InsightStatement>> {
    let mut insights = Vec::new();

    if caps.has_sales && caps.has_profit {
        insights.push(correlation_rule(view)?);
    }
    if caps.has_category {
        if let Some(statement) = dominant_category_rule(view)? {
            insights.push(statement);
        }
    }
    if caps.has_sales && caps.has_profit {
        insights.push(margin_skew_rule(view)?);
    }
    if caps.has_customer && caps.has_sales {
        if let Some(statement) = top_customer_rule(view)? {
            insights.push(statement);
        }
    }
    if caps.has_quantity && caps.has_date {
        insights.push(InsightStatement {
            rule: InsightRule::TemporalVariation,
            text: "Quantity shows temporal variation, indicating seasonal or promotional \
                   impact over the timeline."
                .to_string(),
        });
    }

    Ok(insights)
}

/// Sales↔Profit Pearson correlation bucketed by strict threshold
/// comparisons. NaN (undefined) falls through to the weak bucket, as do the
/// exact boundary values.
fn correlation_rule(view: &FilteredView) -> Result<InsightStatement> {
    let (sales, profit) = paired_values(&view.frame, columns::SALES, columns::PROFIT)?;
    let r = pearson_correlation(&sales, &profit);

    let text = if r > CORR_STRONG {
        "Higher sales generally lead to higher profit, showing a strong positive business \
         relationship."
    } else if r < CORR_NEGATIVE {
        "Sales and profit move in opposite directions, suggesting discounting or cost \
         pressure on larger orders."
    } else {
        "Sales and profit show no strong correlation, indicating margins vary depending \
         on product."
    };

    Ok(InsightStatement {
        rule: InsightRule::Correlation,
        text: text.to_string(),
    })
}

/// The category with the highest row count (mode, not sum).
fn dominant_category_rule(view: &FilteredView) -> Result<Option<InsightStatement>> {
    let series = view
        .frame
        .column(columns::CATEGORY)?
        .as_materialized_series()
        .clone();
    let counts = series.value_counts(true, false, "counts".into(), false)?;
    if counts.height() == 0 {
        return Ok(None);
    }
    let top = counts
        .column(columns::CATEGORY)?
        .as_materialized_series()
        .cast(&DataType::String)?;
    let Some(name) = top.str()?.get(0).map(|s| s.to_string()) else {
        return Ok(None);
    };

    Ok(Some(InsightStatement {
        rule: InsightRule::DominantCategory,
        text: format!(
            "Category {} dominates in frequency, with noticeably varying sales \
             distribution across categories.",
            name
        ),
    }))
}

/// Skewness of the per-record profit-margin distribution. NaN (undefined)
/// falls to the balanced bucket.
fn margin_skew_rule(view: &FilteredView) -> Result<InsightStatement> {
    let margins = record_margins(view)?;
    let skew = skewness(&margins);

    let text = if skew > SKEW_RIGHT {
        "Profit margins are right-skewed, meaning a small number of high-margin records \
         dominate overall profitability."
    } else {
        "Profit margins are mostly balanced without extreme outliers."
    };

    Ok(InsightStatement {
        rule: InsightRule::MarginSkew,
        text: text.to_string(),
    })
}

/// The customer with the highest summed sales.
fn top_customer_rule(view: &FilteredView) -> Result<Option<InsightStatement>> {
    let top = top_n(&view.frame, columns::CUSTOMER, columns::SALES, 1)?;
    let Some((name, total)) = top.into_iter().next() else {
        return Ok(None);
    };

    Ok(Some(InsightStatement {
        rule: InsightRule::TopCustomer,
        text: format!(
            "Customer {} leads total sales ({:.2}) over the selected range.",
            name, total
        ),
    }))
}
