pub mod error;
pub mod types;

pub use error::{
    classify_sqlstate, parse_sql_error, sql_error, AvaticaError, ErrorCategory, Result,
    SqlErrorInfo,
};
pub use types::{DataRow, Value};
