//! Column capabilities: one schema probe at load time instead of ad-hoc
//! membership checks scattered through every component.

use polars::prelude::*;

use crate::dataset::columns;

/// What the loaded schema supports. Consulted by the filter engine, chart
/// builder, insight rules, and metrics strip; an absent column silently
/// disables everything that needs it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ColumnCaps {
    /// True only when `Date` exists *and* carries a temporal dtype. A `Date`
    /// column that failed coercion stays a string and does not count.
    pub has_date: bool,
    pub has_product: bool,
    pub has_category: bool,
    pub has_customer: bool,
    pub has_sales: bool,
    pub has_profit: bool,
    pub has_quantity: bool,
}

impl ColumnCaps {
    pub fn from_frame(frame: &DataFrame) -> Self {
        let schema = frame.schema();
        let temporal = |name: &str| {
            schema
                .get(name)
                .is_some_and(|dtype| matches!(dtype, DataType::Date | DataType::Datetime(_, _)))
        };
        let present = |name: &str| schema.get(name).is_some();

        Self {
            has_date: temporal(columns::DATE),
            has_product: present(columns::PRODUCT),
            has_category: present(columns::CATEGORY),
            has_customer: present(columns::CUSTOMER),
            has_sales: present(columns::SALES),
            has_profit: present(columns::PROFIT),
            has_quantity: present(columns::QUANTITY),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caps_from_full_frame() {
        let df = df!(
            "Product" => &["A"],
            "Sales" => &[1.0_f64],
            "Profit" => &[0.5_f64]
        )
        .unwrap();
        let caps = ColumnCaps::from_frame(&df);
        assert!(caps.has_product);
        assert!(caps.has_sales);
        assert!(caps.has_profit);
        assert!(!caps.has_date);
        assert!(!caps.has_category);
        assert!(!caps.has_customer);
        assert!(!caps.has_quantity);
    }

    #[test]
    fn string_date_column_does_not_enable_dates() {
        let df = df!("Date" => &["2024-01-01"], "Sales" => &[1.0_f64]).unwrap();
        let caps = ColumnCaps::from_frame(&df);
        assert!(!caps.has_date);
    }

    #[test]
    fn temporal_date_column_enables_dates() {
        let mut df = df!("Sales" => &[1.0_f64]).unwrap();
        let date = Series::new("Date".into(), vec![19723_i32])
            .cast(&DataType::Date)
            .unwrap();
        df.with_column(date).unwrap();
        assert!(ColumnCaps::from_frame(&df).has_date);
    }
}
