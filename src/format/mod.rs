//! Output formatting for API records, prices and tokens (table, JSON, CSV).

use crate::api::{BearerToken, Field, Manifest, ProductPrice, ProductPriceList, Record};
use crate::config::OutputFormat;
use serde_json::{json, Value};

/// Widest a table cell may get before it is cut.
const MAX_CELL_WIDTH: usize = 40;

/// Formats API data for output.
pub struct Formatter {
    format: OutputFormat,
}

impl Formatter {
    /// Creates a new formatter.
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a single record, e.g. one category.
    pub fn format_record(&self, record: &Record) -> String {
        match self.format {
            OutputFormat::Json => pretty(&record.to_value()),
            OutputFormat::Table => self.table_single(record),
            OutputFormat::Csv => self.csv_records(std::slice::from_ref(record)),
        }
    }

    /// Formats the items of a listing: records or plain values such as product ids.
    pub fn format_items(&self, items: &[Field]) -> String {
        if items.is_empty() {
            return match self.format {
                OutputFormat::Json => "[]".to_string(),
                OutputFormat::Csv => String::new(),
                OutputFormat::Table => "No results found.".to_string(),
            };
        }

        let records: Option<Vec<&Record>> = items.iter().map(Field::as_record).collect();
        match records {
            Some(records) => self.format_records(&records),
            None => self.format_values(items),
        }
    }

    /// Formats a list of records.
    pub fn format_records(&self, records: &[&Record]) -> String {
        match self.format {
            OutputFormat::Json => {
                pretty(&Value::Array(records.iter().map(|r| r.to_value()).collect()))
            }
            OutputFormat::Table => self.table_records(records),
            OutputFormat::Csv => {
                let owned: Vec<Record> = records.iter().map(|r| (*r).clone()).collect();
                self.csv_records(&owned)
            }
        }
    }

    /// Formats grouped prices. With `valid_only`, rows without any price are dropped.
    pub fn format_prices(&self, prices: &ProductPriceList, valid_only: bool) -> String {
        let groups: Vec<(u64, Vec<&ProductPrice>)> = if valid_only {
            prices.valid_prices().into_iter().collect()
        } else {
            prices.prices().iter().map(|(id, rows)| (*id, rows.iter().collect())).collect()
        };

        match self.format {
            OutputFormat::Json => {
                let map: serde_json::Map<String, Value> = groups
                    .iter()
                    .map(|(id, rows)| {
                        (id.to_string(), rows.iter().map(|p| p.to_value()).collect())
                    })
                    .collect();
                pretty(&Value::Object(map))
            }
            OutputFormat::Table => self.table_prices(&groups),
            OutputFormat::Csv => self.csv_prices(&groups),
        }
    }

    /// Formats the sort values and filters of a search manifest.
    pub fn format_manifest(&self, manifest: &Manifest<'_>) -> String {
        match self.format {
            OutputFormat::Json => pretty(&json!({
                "sorting": manifest.sorting().iter().map(Record::to_value).collect::<Vec<_>>(),
                "filters": manifest.filters().iter().map(Record::to_value).collect::<Vec<_>>(),
            })),
            OutputFormat::Table => {
                let mut lines = vec!["Sort values:".to_string()];
                for value in manifest.sort_values() {
                    lines.push(format!("  {}", value));
                }

                lines.push(String::new());
                lines.push("Filters:".to_string());
                for filter in manifest.filters() {
                    let items = filter.get_records("items").map_or(0, <[Record]>::len);
                    lines.push(format!(
                        "  {:<24} {} ({} values)",
                        filter.get_str("name").unwrap_or("?"),
                        filter.get_str("displayText").unwrap_or(""),
                        items
                    ));
                }

                lines.join("\n")
            }
            OutputFormat::Csv => {
                let mut lines = vec!["kind,name".to_string()];
                for value in manifest.sort_values() {
                    lines.push(format!("sort,{}", csv_escape(value)));
                }
                for filter in manifest.filters() {
                    lines.push(format!("filter,{}", csv_escape(filter.get_str("name").unwrap_or(""))));
                }
                lines.join("\n")
            }
        }
    }

    /// Formats a bearer token.
    pub fn format_token(&self, token: &BearerToken) -> String {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(token).unwrap_or_else(|_| "{}".to_string())
            }
            OutputFormat::Table => {
                let state = if token.is_expired() { "Expired" } else { "Valid" };
                [
                    format!("Token:   {}", token.token),
                    format!("Type:    {}", token.token_type),
                    format!("Issued:  {}", token.issued_at.to_rfc2822()),
                    format!("Expires: {}", token.expires_at.to_rfc2822()),
                    format!("State:   {}", state),
                ]
                .join("\n")
            }
            OutputFormat::Csv => format!(
                "access_token,token_type,issued,expires\n{},{},{},{}",
                token.token,
                token.token_type,
                token.issued_at.to_rfc3339(),
                token.expires_at.to_rfc3339()
            ),
        }
    }

    // Table formatting

    fn table_single(&self, record: &Record) -> String {
        let width = record.keys().map(str::len).max().unwrap_or(0) + 1;

        record
            .keys()
            .map(|key| {
                let value = record.raw(key).map(cell).unwrap_or_default();
                format!("{:<width$} {}", format!("{}:", key), value)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn table_records(&self, records: &[&Record]) -> String {
        let columns = columns(records);
        let rows: Vec<Vec<String>> = records
            .iter()
            .map(|r| {
                columns
                    .iter()
                    .map(|c| truncate(&r.raw(c).map(cell).unwrap_or_default(), MAX_CELL_WIDTH))
                    .collect()
            })
            .collect();

        let widths: Vec<usize> = columns
            .iter()
            .enumerate()
            .map(|(i, c)| {
                rows.iter().map(|row| row[i].chars().count()).max().unwrap_or(0).max(c.len())
            })
            .collect();

        let mut lines = Vec::new();
        lines.push(join_padded(columns.iter().map(String::as_str), &widths));
        lines.push(
            widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("  "),
        );
        for row in &rows {
            lines.push(join_padded(row.iter().map(String::as_str), &widths));
        }

        lines.push(String::new());
        lines.push(format!("Total: {} results", records.len()));

        lines.join("\n")
    }

    fn table_prices(&self, groups: &[(u64, Vec<&ProductPrice>)]) -> String {
        let mut lines = Vec::new();

        lines.push(format!(
            "{:<10}  {:<24}  {:>9}  {:>9}  {:>9}  {:>9}  {:>10}",
            "Product", "Subtype", "Low", "Mid", "High", "Market", "Direct Low"
        ));
        lines.push(format!(
            "{:-<10}  {:-<24}  {:->9}  {:->9}  {:->9}  {:->9}  {:->10}",
            "", "", "", "", "", "", ""
        ));

        for (id, rows) in groups {
            if rows.is_empty() {
                lines.push(format!("{:<10}  {:<24}", id, "(no prices)"));
                continue;
            }

            for price in rows {
                lines.push(format!(
                    "{:<10}  {:<24}  {:>9}  {:>9}  {:>9}  {:>9}  {:>10}",
                    id,
                    truncate(price.sub_type_name().unwrap_or("-"), 24),
                    money(price.low_price()),
                    money(price.mid_price()),
                    money(price.high_price()),
                    money(price.market_price()),
                    money(price.direct_low_price()),
                ));
            }
        }

        lines.push(String::new());
        lines.push(format!("Total: {} products", groups.len()));

        lines.join("\n")
    }

    // CSV formatting

    fn csv_records(&self, records: &[Record]) -> String {
        let refs: Vec<&Record> = records.iter().collect();
        let columns = columns(&refs);

        let mut lines = Vec::new();
        lines.push(columns.iter().map(|c| csv_escape(c)).collect::<Vec<_>>().join(","));
        for record in records {
            lines.push(
                columns
                    .iter()
                    .map(|c| csv_escape(&record.raw(c).map(cell).unwrap_or_default()))
                    .collect::<Vec<_>>()
                    .join(","),
            );
        }

        lines.join("\n")
    }

    fn csv_prices(&self, groups: &[(u64, Vec<&ProductPrice>)]) -> String {
        let mut lines = Vec::new();
        lines.push(
            "productId,subTypeName,lowPrice,midPrice,highPrice,marketPrice,directLowPrice"
                .to_string(),
        );

        for (id, rows) in groups {
            for price in rows {
                let optional = |v: Option<f64>| v.map(|p| p.to_string()).unwrap_or_default();
                lines.push(format!(
                    "{},{},{},{},{},{},{}",
                    id,
                    csv_escape(price.sub_type_name().unwrap_or("")),
                    optional(price.low_price()),
                    optional(price.mid_price()),
                    optional(price.high_price()),
                    optional(price.market_price()),
                    optional(price.direct_low_price()),
                ));
            }
        }

        lines.join("\n")
    }

    fn format_values(&self, items: &[Field]) -> String {
        let values: Vec<Value> = items.iter().map(Field::to_value).collect();

        match self.format {
            OutputFormat::Json => pretty(&Value::Array(values)),
            OutputFormat::Table => {
                let mut lines: Vec<String> = values.iter().map(cell).collect();
                lines.push(String::new());
                lines.push(format!("Total: {} results", values.len()));
                lines.join("\n")
            }
            OutputFormat::Csv => {
                let mut lines = vec!["value".to_string()];
                lines.extend(values.iter().map(|v| csv_escape(&cell(v))));
                lines.join("\n")
            }
        }
    }
}

/// Scalar columns across all records, in first-seen order.
fn columns(records: &[&Record]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for record in records {
        for key in record.keys() {
            let scalar = !matches!(record.raw(key), Some(Value::Array(_) | Value::Object(_)));
            if scalar && !columns.iter().any(|c| c == key) {
                columns.push(key.to_string());
            }
        }
    }
    columns
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn money(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.2}", v))
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() > width {
        let cut: String = text.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

fn join_padded<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .zip(widths)
        .map(|(text, width)| format!("{:<width$}", text, width = *width))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "null".to_string())
}

fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiResponse;

    fn category(id: u64, name: &str) -> Record {
        Record::from_value(json!({
            "categoryId": id,
            "name": name,
            "displayName": name,
            "popularity": 1000,
            "isScannable": true,
            "modifiedOn": "2022-01-10T20:04:42.803"
        }))
        .unwrap()
    }

    fn prices() -> ProductPriceList {
        ProductPriceList::new(
            Record::from_value(json!({
                "success": true,
                "errors": [],
                "results": [
                    { "productId": 85737, "lowPrice": 4.99, "midPrice": 5.63, "highPrice": 7.73,
                      "marketPrice": 10.35, "directLowPrice": null, "subTypeName": "Reverse Holofoil" },
                    { "productId": 85737, "lowPrice": null, "midPrice": null, "highPrice": null,
                      "marketPrice": null, "directLowPrice": null, "subTypeName": "Normal" },
                    { "productId": 1, "lowPrice": null, "midPrice": null, "highPrice": null,
                      "marketPrice": null, "directLowPrice": null, "subTypeName": "Normal" }
                ]
            }))
            .unwrap(),
        )
    }

    fn token() -> BearerToken {
        BearerToken::from_response(&json!({
            "access_token": "abc123",
            "token_type": "bearer",
            "expires_in": 1209599,
            ".issued": "Wed, 12 Jan 2022 03:35:00 GMT",
            ".expires": "Fri, 01 Jan 2100 00:00:00 GMT"
        }))
        .unwrap()
    }

    #[test]
    fn test_json_record() {
        let output = Formatter::new(OutputFormat::Json).format_record(&category(3, "Pokemon"));
        let parsed: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["categoryId"], 3);
        assert_eq!(parsed["name"], "Pokemon");
    }

    #[test]
    fn test_table_record() {
        let output = Formatter::new(OutputFormat::Table).format_record(&category(3, "Pokemon"));
        assert!(output.contains("categoryId:"));
        assert!(output.contains("Pokemon"));
        assert!(output.contains("true"));
    }

    #[test]
    fn test_table_records() {
        let items = vec![
            Field::Record(category(1, "Magic")),
            Field::Record(category(3, "Pokemon")),
        ];
        let output = Formatter::new(OutputFormat::Table).format_items(&items);

        let header = output.lines().next().unwrap();
        assert!(header.contains("categoryId"));
        assert!(header.contains("name"));
        assert!(output.contains("Magic"));
        assert!(output.contains("Pokemon"));
        assert!(output.contains("Total: 2 results"));
    }

    #[test]
    fn test_table_truncates_long_cells() {
        let long = "x".repeat(80);
        let items = vec![Field::Record(category(1, &long))];
        let output = Formatter::new(OutputFormat::Table).format_items(&items);
        assert!(!output.contains(&long));
        assert!(output.contains("..."));
    }

    #[test]
    fn test_table_plain_values() {
        let items = vec![Field::Value(json!(85737)), Field::Value(json!(85736))];
        let output = Formatter::new(OutputFormat::Table).format_items(&items);
        assert!(output.starts_with("85737\n85736"));
        assert!(output.contains("Total: 2 results"));
    }

    #[test]
    fn test_empty_items() {
        assert_eq!(Formatter::new(OutputFormat::Json).format_items(&[]), "[]");
        assert_eq!(Formatter::new(OutputFormat::Table).format_items(&[]), "No results found.");
        assert_eq!(Formatter::new(OutputFormat::Csv).format_items(&[]), "");
    }

    #[test]
    fn test_csv_records_escape() {
        let items = vec![Field::Record(category(1, "Magic, The Gathering"))];
        let output = Formatter::new(OutputFormat::Csv).format_items(&items);

        let mut lines = output.lines();
        assert_eq!(
            lines.next().unwrap(),
            "categoryId,displayName,isScannable,modifiedOn,name,popularity"
        );
        assert!(lines.next().unwrap().contains("\"Magic, The Gathering\""));
    }

    #[test]
    fn test_csv_skips_nested_columns() {
        let record = Record::from_value(json!({ "id": 1, "tags": ["a"], "meta": { "x": 1 } })).unwrap();
        let output = Formatter::new(OutputFormat::Csv).format_record(&record);
        assert_eq!(output, "id\n1");
    }

    #[test]
    fn test_json_values() {
        let items = vec![Field::Value(json!(1)), Field::Value(json!(2))];
        let output = Formatter::new(OutputFormat::Json).format_items(&items);
        let parsed: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed, json!([1, 2]));
    }

    #[test]
    fn test_table_prices() {
        let output = Formatter::new(OutputFormat::Table).format_prices(&prices(), false);
        assert!(output.contains("Reverse Holofoil"));
        assert!(output.contains("10.35"));
        assert!(output.contains("Normal"));
        assert!(output.contains("Total: 2 products"));
    }

    #[test]
    fn test_table_prices_valid_only() {
        let output = Formatter::new(OutputFormat::Table).format_prices(&prices(), true);
        assert!(output.contains("Reverse Holofoil"));
        assert!(!output.contains("Normal"));
        assert!(output.contains("(no prices)"));
        assert!(output.contains("Total: 2 products"));
    }

    #[test]
    fn test_json_prices() {
        let output = Formatter::new(OutputFormat::Json).format_prices(&prices(), true);
        let parsed: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["85737"].as_array().unwrap().len(), 1);
        assert_eq!(parsed["1"], json!([]));
    }

    #[test]
    fn test_csv_prices() {
        let output = Formatter::new(OutputFormat::Csv).format_prices(&prices(), false);
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("productId,subTypeName"));
        assert!(lines.contains(&"85737,Reverse Holofoil,4.99,5.63,7.73,10.35,"));
        assert!(lines.contains(&"1,Normal,,,,,"));
    }

    #[test]
    fn test_manifest_table() {
        let record = Record::from_value(json!({
            "success": true,
            "errors": [],
            "results": [{
                "sorting": [{ "text": "Best Match", "value": "Relevance" }],
                "filters": [{ "name": "SetName", "displayText": "Set",
                              "items": [{ "text": "Base Set", "value": "Base Set" }] }]
            }]
        }))
        .unwrap();
        let manifest = Manifest::new(ApiResponse::detached(record));

        let output = Formatter::new(OutputFormat::Table).format_manifest(&manifest);
        assert!(output.contains("Relevance"));
        assert!(output.contains("SetName"));
        assert!(output.contains("(1 values)"));

        let csv = Formatter::new(OutputFormat::Csv).format_manifest(&manifest);
        assert_eq!(csv, "kind,name\nsort,Relevance\nfilter,SetName");
    }

    #[test]
    fn test_token_formats() {
        let token = token();

        let json_out = Formatter::new(OutputFormat::Json).format_token(&token);
        let parsed: Value = serde_json::from_str(&json_out).unwrap();
        assert_eq!(parsed["access_token"], "abc123");
        assert_eq!(parsed[".expires"], "Fri, 01 Jan 2100 00:00:00 GMT");

        let table = Formatter::new(OutputFormat::Table).format_token(&token);
        assert!(table.contains("Token:   abc123"));
        assert!(table.contains("State:   Valid"));

        let csv = Formatter::new(OutputFormat::Csv).format_token(&token);
        assert!(csv.starts_with("access_token,token_type,issued,expires\nabc123,bearer,"));
    }

    #[test]
    fn test_truncate_handles_multibyte() {
        assert_eq!(truncate("Pokémon Japan", 8), "Pokém...");
        assert_eq!(truncate("short", 8), "short");
    }
}
