use crate::mapper::ColumnMapping;
use crate::models::{CanonicalTransaction, DateOrder, RawTable, SourceRow, TxType};
use crate::normalize::{normalize_amount, normalize_date, to_cents};

pub struct RowContext<'a> {
    pub project_id: i64,
    pub source_file: &'a str,
    pub date_order: DateOrder,
    pub payment_source_id: Option<i64>,
}

#[derive(Debug, Default)]
pub struct BuildOutcome {
    pub candidates: Vec<CanonicalTransaction>,
    pub skipped: usize,
    /// Per-row drop reasons, in input order. Surfaced verbatim in the manual
    /// import summary.
    pub reasons: Vec<String>,
}

impl BuildOutcome {
    fn skip(&mut self, row_number: usize, reason: String) {
        self.skipped += 1;
        self.reasons.push(format!("row {row_number}: {reason}"));
    }
}

fn cell<'a>(row: &'a [String], col: Option<usize>) -> &'a str {
    col.and_then(|c| row.get(c)).map(|s| s.trim()).unwrap_or("")
}

/// Resolve the signed amount from either a unified amount column or a
/// debit/credit split. Returns `None` when the amount column is present but
/// unreadable; a resolved zero is returned as such and dropped by the caller.
fn resolve_amount(row: &[String], mapping: &ColumnMapping) -> Option<(f64, TxType)> {
    let amount_raw = cell(row, mapping.amount);
    if !amount_raw.is_empty() {
        let signed = normalize_amount(amount_raw)?;
        let tx_type = if signed < 0.0 { TxType::Expense } else { TxType::Income };
        return Some((signed.abs(), tx_type));
    }

    let debit = normalize_amount(cell(row, mapping.debit)).unwrap_or(0.0);
    if to_cents(debit) != 0 {
        return Some((debit.abs(), TxType::Expense));
    }
    let credit = normalize_amount(cell(row, mapping.credit)).unwrap_or(0.0);
    if to_cents(credit) != 0 {
        return Some((credit.abs(), TxType::Income));
    }
    Some((0.0, TxType::Expense))
}

/// Turn raw table rows into canonical transaction candidates. Pure: nothing
/// is persisted here. A row is accepted only when its date normalizes, its
/// description (after falling back to the reference column) is non-empty,
/// and its resolved amount is positive; everything else is counted and
/// explained, never fatal.
pub fn build_rows(table: &RawTable, mapping: &ColumnMapping, ctx: &RowContext) -> BuildOutcome {
    let mut outcome = BuildOutcome::default();

    for (i, row) in table.rows.iter().enumerate() {
        let row_number = i + 2; // 1-based, after the header row

        let date_raw = cell(row, mapping.date);
        let Some(date) = normalize_date(date_raw, ctx.date_order) else {
            outcome.skip(row_number, format!("unparseable date '{date_raw}'"));
            continue;
        };

        let mut description = cell(row, mapping.description).to_string();
        if description.is_empty() {
            description = cell(row, mapping.reference).to_string();
        }
        if description.is_empty() {
            outcome.skip(row_number, "empty description".to_string());
            continue;
        }

        let Some((amount, tx_type)) = resolve_amount(row, mapping) else {
            let raw = cell(row, mapping.amount);
            outcome.skip(row_number, format!("unparseable amount '{raw}'"));
            continue;
        };
        if to_cents(amount) == 0 {
            outcome.skip(row_number, "zero amount".to_string());
            continue;
        }

        let category = match cell(row, mapping.category) {
            "" => None,
            c => Some(c.to_string()),
        };

        outcome.candidates.push(CanonicalTransaction {
            id: None,
            project_id: ctx.project_id,
            date,
            description,
            amount,
            tx_type,
            category,
            source_file: ctx.source_file.to_string(),
            external_id: None,
            payment_source_id: ctx.payment_source_id,
        });
    }

    outcome
}

/// The API-client path: each platform client hands over pre-shaped rows and
/// a stable per-event id; the builder owns the `<platform>:<id>` prefixing
/// so external ids stay globally unique.
pub fn build_source_rows(
    rows: &[SourceRow],
    platform: &str,
    project_id: i64,
    date_order: DateOrder,
) -> BuildOutcome {
    let mut outcome = BuildOutcome::default();

    for (i, row) in rows.iter().enumerate() {
        let row_number = i + 1;

        if row.id.trim().is_empty() {
            outcome.skip(row_number, "missing source event id".to_string());
            continue;
        }

        let Some(date) = normalize_date(&row.date, date_order) else {
            outcome.skip(row_number, format!("unparseable date '{}'", row.date));
            continue;
        };

        let description = row.description.trim().to_string();
        if description.is_empty() {
            outcome.skip(row_number, "empty description".to_string());
            continue;
        }

        let Some(signed) = normalize_amount(&row.amount) else {
            outcome.skip(row_number, format!("unparseable amount '{}'", row.amount));
            continue;
        };
        if to_cents(signed) == 0 {
            outcome.skip(row_number, "zero amount".to_string());
            continue;
        }
        let tx_type = if signed < 0.0 { TxType::Expense } else { TxType::Income };

        outcome.candidates.push(CanonicalTransaction {
            id: None,
            project_id,
            date,
            description,
            amount: signed.abs(),
            tx_type,
            category: row.category.clone(),
            source_file: platform.to_string(),
            external_id: Some(format!("{platform}:{}", row.id.trim())),
            payment_source_id: None,
        });
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::{auto_map, FieldKeywords};

    fn table(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable {
            headers: headers.iter().map(|s| s.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        }
    }

    fn ctx() -> RowContext<'static> {
        RowContext {
            project_id: 1,
            source_file: "test.csv",
            date_order: DateOrder::DayFirst,
            payment_source_id: None,
        }
    }

    #[test]
    fn test_builds_income_and_expense_from_signed_amount() {
        let t = table(
            &["Date", "Description", "Amount"],
            &[
                &["15/03/2024", "Client payment", "1,500.00"],
                &["16/03/2024", "Office rent", "-800.00"],
            ],
        );
        let mapping = auto_map(&t.headers, &FieldKeywords::default());
        let out = build_rows(&t, &mapping, &ctx());
        assert_eq!(out.candidates.len(), 2);
        assert_eq!(out.skipped, 0);

        let income = &out.candidates[0];
        assert_eq!(income.date, "2024-03-15");
        assert_eq!(income.amount, 1500.0);
        assert_eq!(income.tx_type, TxType::Income);

        let expense = &out.candidates[1];
        assert_eq!(expense.amount, 800.0);
        assert_eq!(expense.tx_type, TxType::Expense);
    }

    #[test]
    fn test_debit_credit_split() {
        let t = table(
            &["Fecha", "Concepto", "Cargo", "Abono"],
            &[
                &["15/03/2024", "Compra", "45,00", ""],
                &["16/03/2024", "Ingreso", "", "1.200,00"],
            ],
        );
        let mapping = auto_map(&t.headers, &FieldKeywords::default());
        let out = build_rows(&t, &mapping, &ctx());
        assert_eq!(out.candidates.len(), 2);
        assert_eq!(out.candidates[0].tx_type, TxType::Expense);
        assert_eq!(out.candidates[0].amount, 45.0);
        assert_eq!(out.candidates[1].tx_type, TxType::Income);
        assert_eq!(out.candidates[1].amount, 1200.0);
    }

    #[test]
    fn test_zero_amount_is_skipped_with_reason() {
        let t = table(
            &["Date", "Description", "Amount"],
            &[&["15/03/2024", "Nothing", "0.00"]],
        );
        let mapping = auto_map(&t.headers, &FieldKeywords::default());
        let out = build_rows(&t, &mapping, &ctx());
        assert!(out.candidates.is_empty());
        assert_eq!(out.skipped, 1);
        assert!(out.reasons[0].contains("zero amount"));
    }

    #[test]
    fn test_unparseable_date_is_skipped() {
        let t = table(
            &["Date", "Description", "Amount"],
            &[&["soon", "Thing", "10.00"], &["15/03/2024", "Ok", "10.00"]],
        );
        let mapping = auto_map(&t.headers, &FieldKeywords::default());
        let out = build_rows(&t, &mapping, &ctx());
        assert_eq!(out.candidates.len(), 1);
        assert_eq!(out.skipped, 1);
        assert!(out.reasons[0].starts_with("row 2:"));
    }

    #[test]
    fn test_description_falls_back_to_reference() {
        let t = table(
            &["Date", "Description", "Amount", "Reference"],
            &[&["15/03/2024", "", "10.00", "INV-042"]],
        );
        let mapping = auto_map(&t.headers, &FieldKeywords::default());
        let out = build_rows(&t, &mapping, &ctx());
        assert_eq!(out.candidates.len(), 1);
        assert_eq!(out.candidates[0].description, "INV-042");
    }

    #[test]
    fn test_empty_description_without_fallback_is_skipped() {
        let t = table(
            &["Date", "Description", "Amount"],
            &[&["15/03/2024", "   ", "10.00"]],
        );
        let mapping = auto_map(&t.headers, &FieldKeywords::default());
        let out = build_rows(&t, &mapping, &ctx());
        assert_eq!(out.skipped, 1);
        assert!(out.reasons[0].contains("empty description"));
    }

    #[test]
    fn test_category_column_carried_over() {
        let t = table(
            &["Date", "Description", "Amount", "Category"],
            &[&["15/03/2024", "Stripe fee", "-2.50", "Fees"]],
        );
        let mapping = auto_map(&t.headers, &FieldKeywords::default());
        let out = build_rows(&t, &mapping, &ctx());
        assert_eq!(out.candidates[0].category.as_deref(), Some("Fees"));
    }

    #[test]
    fn test_source_rows_prefix_external_id() {
        let rows = vec![
            SourceRow {
                id: "txn_123".to_string(),
                date: "2024-03-15T10:00:00Z".to_string(),
                description: "Payout".to_string(),
                amount: "250.00".to_string(),
                category: None,
            },
            SourceRow {
                id: "refund:re_9".to_string(),
                date: "2024-03-16".to_string(),
                description: "Refund".to_string(),
                amount: "-40.00".to_string(),
                category: None,
            },
        ];
        let out = build_source_rows(&rows, "stripe", 1, DateOrder::MonthFirst);
        assert_eq!(out.candidates.len(), 2);
        assert_eq!(out.candidates[0].external_id.as_deref(), Some("stripe:txn_123"));
        assert_eq!(out.candidates[1].external_id.as_deref(), Some("stripe:refund:re_9"));
        assert_eq!(out.candidates[1].tx_type, TxType::Expense);
    }

    #[test]
    fn test_source_rows_missing_id_skipped() {
        let rows = vec![SourceRow {
            id: "  ".to_string(),
            date: "2024-03-15".to_string(),
            description: "Mystery".to_string(),
            amount: "1.00".to_string(),
            category: None,
        }];
        let out = build_source_rows(&rows, "paypal", 1, DateOrder::MonthFirst);
        assert!(out.candidates.is_empty());
        assert_eq!(out.skipped, 1);
    }
}
