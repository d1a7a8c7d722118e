/// Arrow schemas and batch builders for exported order and log tables.
pub mod export {
    use std::sync::Arc;

    use arrow::array::{
        ArrayRef, BooleanArray, Int64Array, ListBuilder, Int64Builder, StringArray,
        TimestampMicrosecondArray,
    };
    use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
    use arrow::error::ArrowError;
    use arrow::record_batch::RecordBatch;

    use crate::event::InteractionEvent;
    use crate::model::OrderAssignment;

    fn utc_micros() -> DataType {
        DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into()))
    }

    /// Schema for persisted order assignments.
    pub fn orders_schema() -> Schema {
        Schema::new(vec![
            Field::new("user_id", DataType::Utf8, false),
            Field::new("query_id", DataType::Int64, false),
            Field::new(
                "doc_order",
                DataType::List(Arc::new(Field::new("item", DataType::Int64, true))),
                false,
            ),
            Field::new("created_at", utc_micros(), false),
        ])
    }

    /// Schema for the append-only interaction log.
    pub fn logs_schema() -> Schema {
        Schema::new(vec![
            Field::new("user_id", DataType::Utf8, false),
            Field::new("qid", DataType::Int64, false),
            Field::new("docno", DataType::Int64, false),
            Field::new("event_type", DataType::Utf8, false),
            Field::new("start_idx", DataType::Int64, false),
            Field::new("end_idx", DataType::Int64, false),
            Field::new("duration", DataType::Int64, false),
            Field::new("pass_flag", DataType::Boolean, false),
            Field::new("timestamp", utc_micros(), false),
        ])
    }

    pub fn orders_batch(assignments: &[OrderAssignment]) -> Result<RecordBatch, ArrowError> {
        let mut doc_order = ListBuilder::new(Int64Builder::new());
        for a in assignments {
            doc_order.values().append_slice(&a.doc_ids);
            doc_order.append(true);
        }
        let columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from_iter_values(
                assignments.iter().map(|a| a.user_id.as_str()),
            )),
            Arc::new(Int64Array::from_iter_values(
                assignments.iter().map(|a| a.query_id),
            )),
            Arc::new(doc_order.finish()),
            Arc::new(
                TimestampMicrosecondArray::from_iter_values(
                    assignments.iter().map(|a| a.created_at.timestamp_micros()),
                )
                .with_timezone("UTC"),
            ),
        ];
        RecordBatch::try_new(Arc::new(orders_schema()), columns)
    }

    pub fn logs_batch(events: &[InteractionEvent]) -> Result<RecordBatch, ArrowError> {
        let int_col = |f: fn(&InteractionEvent) -> i64| -> ArrayRef {
            Arc::new(Int64Array::from_iter_values(events.iter().map(f)))
        };
        let columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from_iter_values(
                events.iter().map(|e| e.user_id.as_str()),
            )),
            int_col(|e| e.query_id),
            int_col(|e| e.doc_ref),
            Arc::new(StringArray::from_iter_values(
                events.iter().map(|e| e.event_type.as_str()),
            )),
            int_col(|e| e.start_idx),
            int_col(|e| e.end_idx),
            int_col(|e| e.duration),
            Arc::new(BooleanArray::from(
                events.iter().map(|e| e.pass_flag).collect::<Vec<_>>(),
            )),
            Arc::new(
                TimestampMicrosecondArray::from_iter_values(
                    events.iter().map(|e| e.timestamp.timestamp_micros()),
                )
                .with_timezone("UTC"),
            ),
        ];
        RecordBatch::try_new(Arc::new(logs_schema()), columns)
    }
}
