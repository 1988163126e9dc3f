// ==========================================
// 工序报工配额系统 - CSV 订单加载
// ==========================================
// 列: order_id, title, operation_code, operation_name, planned_qty
// 规则: 按订单分组，组内保持行序（即工序顺序）
// ==========================================

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use tracing::info;

use crate::domain::order::{Operation, Order};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::order_source::StaticOrderSource;

const REQUIRED_COLUMNS: [&str; 5] = [
    "order_id",
    "title",
    "operation_code",
    "operation_name",
    "planned_qty",
];

/// 从 CSV 文件加载订单来源
pub fn load_orders_csv(path: &Path) -> ImportResult<StaticOrderSource> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }
    let file = File::open(path)?;
    let orders = parse_orders(file)?;
    info!(path = %path.display(), orders = orders.len(), "订单 CSV 加载完成");
    StaticOrderSource::new(orders)
}

/// 解析 CSV 内容为订单列表
pub fn parse_orders<R: Read>(reader: R) -> ImportResult<Vec<Order>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let columns = column_positions(&headers)?;

    let mut orders: Vec<Order> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for (idx, record) in reader.records().enumerate() {
        let record = record?;
        let row = idx + 2; // 表头占第1行

        // 跳过空行
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }

        let field = |name: usize| record.get(columns[name]).unwrap_or("").to_string();
        let order_id = field(0);
        let code = field(2);
        if order_id.is_empty() || code.is_empty() {
            return Err(ImportError::FieldMappingError {
                row,
                message: "order_id 与 operation_code 不能为空".to_string(),
            });
        }

        let raw_qty = field(4);
        let planned_qty = raw_qty
            .parse::<u64>()
            .map_err(|e| ImportError::TypeConversionError {
                row,
                field: "planned_qty".to_string(),
                message: format!("{} ({})", e, raw_qty),
            })?;

        let pos = *positions.entry(order_id.clone()).or_insert_with(|| {
            orders.push(Order::new(order_id.clone(), field(1), Vec::new()));
            orders.len() - 1
        });
        let order = &mut orders[pos];
        if order.operation(&code).is_some() {
            return Err(ImportError::DuplicateOperation {
                order_id,
                operation_code: code,
            });
        }
        order.operations.push(Operation::new(code, field(3), planned_qty));
    }

    Ok(orders)
}

fn column_positions(headers: &StringRecord) -> ImportResult<[usize; 5]> {
    let mut positions = [0usize; 5];
    for (slot, name) in REQUIRED_COLUMNS.iter().enumerate() {
        positions[slot] = headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| ImportError::FieldMappingError {
                row: 1,
                message: format!("缺少列: {}", name),
            })?;
    }
    Ok(positions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::order_source::OrderSource;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = "\
order_id,title,operation_code,operation_name,planned_qty
VIGA001,Viga IPE 300,10,Corte,10
VIGA001,Viga IPE 300,20,Soldadura,10
VIGA002,Viga HEB 200,10,Corte,6
VIGA001,Viga IPE 300,30,Pintura,10
";

    #[test]
    fn test_groups_rows_by_order_preserving_sequence() {
        let orders = parse_orders(SAMPLE.as_bytes()).unwrap();
        assert_eq!(orders.len(), 2);
        let codes: Vec<_> = orders[0].operations.iter().map(|op| op.code.as_str()).collect();
        assert_eq!(codes, vec!["10", "20", "30"]);
        assert_eq!(orders[1].title, "Viga HEB 200");
        assert_eq!(orders[1].operations[0].planned_qty, 6);
    }

    #[test]
    fn test_duplicate_operation_rejected() {
        let data = "order_id,title,operation_code,operation_name,planned_qty\nA,t,10,x,1\nA,t,10,y,1\n";
        assert!(matches!(
            parse_orders(data.as_bytes()),
            Err(ImportError::DuplicateOperation { .. })
        ));
    }

    #[test]
    fn test_bad_quantity_reports_row() {
        let data = "order_id,title,operation_code,operation_name,planned_qty\nA,t,10,x,-3\n";
        match parse_orders(data.as_bytes()) {
            Err(ImportError::TypeConversionError { row, field, .. }) => {
                assert_eq!(row, 2);
                assert_eq!(field, "planned_qty");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_missing_column() {
        let data = "order_id,title,operation_code,planned_qty\nA,t,10,1\n";
        assert!(matches!(
            parse_orders(data.as_bytes()),
            Err(ImportError::FieldMappingError { row: 1, .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", SAMPLE).unwrap();

        let source = load_orders_csv(temp_file.path()).unwrap();
        assert!(source.find_order("VIGA001").is_some());
        assert!(matches!(
            load_orders_csv(Path::new("non_existent.csv")),
            Err(ImportError::FileNotFound(_))
        ));
    }
}
