//! Conversion between [`Value`] and Avatica `TypedValue`s.
//!
//! Column and parameter types arrive as JDBC type codes. Each code maps to a
//! wire representation ([`Rep`]), which in turn decides which `TypedValue`
//! field carries the payload and how it is converted (dates travel as days
//! since the epoch, times as milliseconds since midnight and so on).

use avatica_core::{AvaticaError, DataRow, Result, SqlErrorInfo, Value};
use avatica_protocol::messages::{AvaticaParameter, ColumnMetaData, ColumnValue, Rep, Row};
use avatica_protocol::TypedValue;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

pub const JDBC_ARRAY: i32 = 2003;

/// Phoenix reports array parameters as `3000 + component code`.
const PHOENIX_ARRAY_BASE: i32 = 3000;

/// Days between 0001-01-01 and 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Protobuf declares type ids unsigned, while JDBC codes can be negative.
pub fn jdbc_code(id: u32) -> i32 {
    id as i32
}

pub fn rep_for_jdbc(code: i32) -> Option<Rep> {
    let rep = match code {
        -6 | 11 => Rep::Byte,
        5 | 13 => Rep::Short,
        4 | 9 => Rep::Integer,
        -5 | 10 => Rep::Long,
        6 | 7 | 8 | 14 | 15 => Rep::Double,
        2 | 3 => Rep::BigDecimal,
        1 | 12 | -1 | -9 | -15 | -16 | 2005 | 2009 | 2011 => Rep::String,
        91 | 19 => Rep::JavaSqlDate,
        92 | 18 | 2013 => Rep::JavaSqlTime,
        93 | 20 | 2014 => Rep::JavaSqlTimestamp,
        -2 | -3 | -4 | 2004 => Rep::ByteString,
        16 | -7 => Rep::Boolean,
        _ => return None,
    };
    Some(rep)
}

/// JDBC code for the base type name of a `<TYPE> ARRAY` declaration.
fn jdbc_for_type_name(name: &str) -> Option<i32> {
    let code = match name.trim().to_ascii_uppercase().as_str() {
        "TINYINT" => -6,
        "UNSIGNED_TINYINT" => 11,
        "SMALLINT" => 5,
        "UNSIGNED_SMALLINT" => 13,
        "INTEGER" => 4,
        "UNSIGNED_INT" => 9,
        "BIGINT" => -5,
        "UNSIGNED_LONG" => 10,
        "FLOAT" => 6,
        "UNSIGNED_FLOAT" => 14,
        "DOUBLE" => 8,
        "UNSIGNED_DOUBLE" => 15,
        "DECIMAL" => 3,
        "CHAR" => 1,
        "VARCHAR" => 12,
        "DATE" => 91,
        "UNSIGNED_DATE" => 19,
        "TIME" => 92,
        "UNSIGNED_TIME" => 18,
        "TIMESTAMP" => 93,
        "UNSIGNED_TIMESTAMP" => 20,
        "BINARY" => -2,
        "VARBINARY" => -3,
        "BOOLEAN" => 16,
        _ => return None,
    };
    Some(code)
}

/// `TypedValue` field carrying the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireField {
    Bool,
    String,
    Number,
    Bytes,
    Double,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    Plain,
    Integer,
    Float,
    Decimal,
    Date,
    Time,
    Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueType {
    pub rep: Rep,
    pub field: WireField,
    pub conversion: Conversion,
}

impl ValueType {
    pub fn from_rep(rep: Rep) -> Option<Self> {
        let (field, conversion) = match rep {
            Rep::Boolean | Rep::PrimitiveBoolean => (WireField::Bool, Conversion::Plain),
            Rep::Character | Rep::PrimitiveChar | Rep::String => {
                (WireField::String, Conversion::Plain)
            }
            Rep::BigDecimal => (WireField::String, Conversion::Decimal),
            Rep::Integer
            | Rep::PrimitiveInt
            | Rep::Short
            | Rep::PrimitiveShort
            | Rep::Long
            | Rep::PrimitiveLong
            | Rep::Byte
            | Rep::PrimitiveByte
            | Rep::BigInteger
            | Rep::Number => (WireField::Number, Conversion::Integer),
            Rep::JavaSqlTime => (WireField::Number, Conversion::Time),
            Rep::JavaSqlDate => (WireField::Number, Conversion::Date),
            Rep::JavaSqlTimestamp | Rep::JavaUtilDate => {
                (WireField::Number, Conversion::Timestamp)
            }
            Rep::ByteString => (WireField::Bytes, Conversion::Plain),
            Rep::Double | Rep::PrimitiveDouble | Rep::Float | Rep::PrimitiveFloat => {
                (WireField::Double, Conversion::Float)
            }
            _ => return None,
        };
        Some(Self {
            rep,
            field,
            conversion,
        })
    }

    pub fn from_jdbc(code: i32) -> Result<Self> {
        rep_for_jdbc(code)
            .and_then(Self::from_rep)
            .ok_or_else(|| AvaticaError::interface(format!("JDBC type code {code} is not supported")))
    }

    /// Type used to decode a result column. Array columns resolve to their component.
    pub fn for_column(column: &ColumnMetaData) -> Result<Self> {
        let avatica_type = column.r#type.as_ref().ok_or_else(|| {
            AvaticaError::interface(format!("column {} carries no type", column.column_name))
        })?;
        let code = jdbc_code(avatica_type.id);
        if code == JDBC_ARRAY {
            let component = avatica_type.component.as_ref().ok_or_else(|| {
                AvaticaError::interface(format!(
                    "array column {} carries no component type",
                    column.column_name
                ))
            })?;
            return Self::from_jdbc(jdbc_code(component.id));
        }
        if is_phoenix_array(code) {
            return Self::from_jdbc(code - PHOENIX_ARRAY_BASE);
        }
        Self::from_jdbc(code)
    }

    fn to_wire(&self, value: &Value) -> Result<Scalar> {
        let scalar = match (self.conversion, value) {
            (Conversion::Integer, Value::Int(v)) => Scalar::Number(*v),
            (Conversion::Integer, Value::Bool(v)) => Scalar::Number(i64::from(*v)),
            (Conversion::Float, Value::Double(v)) => Scalar::Double(*v),
            (Conversion::Float, Value::Int(v)) => Scalar::Double(*v as f64),
            (Conversion::Decimal, Value::Decimal(v) | Value::String(v)) => {
                Scalar::String(v.clone())
            }
            (Conversion::Decimal, Value::Int(v)) => Scalar::String(v.to_string()),
            (Conversion::Decimal, Value::Double(v)) => Scalar::String(v.to_string()),
            (Conversion::Date, Value::Date(v)) => Scalar::Number(days_since_epoch(*v)),
            (Conversion::Date, Value::Timestamp(v)) => Scalar::Number(days_since_epoch(v.date())),
            (Conversion::Time, Value::Time(v)) => Scalar::Number(millis_since_midnight(*v)),
            (Conversion::Time, Value::Timestamp(v)) => {
                Scalar::Number(millis_since_midnight(v.time()))
            }
            (Conversion::Timestamp, Value::Timestamp(v)) => {
                Scalar::Number(v.and_utc().timestamp_millis())
            }
            (Conversion::Timestamp, Value::Date(v)) => {
                Scalar::Number(days_since_epoch(*v) * MILLIS_PER_DAY)
            }
            (Conversion::Plain, Value::Bool(v)) if self.field == WireField::Bool => {
                Scalar::Bool(*v)
            }
            (Conversion::Plain, Value::String(v) | Value::Decimal(v))
                if self.field == WireField::String =>
            {
                Scalar::String(v.clone())
            }
            (Conversion::Plain, Value::Bytes(v)) if self.field == WireField::Bytes => {
                Scalar::Bytes(v.clone())
            }
            (Conversion::Plain, Value::String(v)) if self.field == WireField::Bytes => {
                Scalar::Bytes(v.as_bytes().to_vec())
            }
            _ => {
                return Err(AvaticaError::programming(format!(
                    "Cannot bind {} value to a {:?} parameter.",
                    value.type_name(),
                    self.rep
                )))
            }
        };
        Ok(scalar)
    }

    fn from_wire(&self, typed: &TypedValue) -> Result<Value> {
        if typed.null {
            return Ok(Value::Null);
        }
        let value = match (self.field, self.conversion) {
            (WireField::Bool, _) => Value::Bool(typed.bool_value),
            (WireField::String, Conversion::Decimal) => Value::Decimal(typed.string_value.clone()),
            (WireField::String, _) => Value::String(typed.string_value.clone()),
            (WireField::Bytes, _) => Value::Bytes(typed.bytes_value.clone()),
            (WireField::Double, _) => Value::Double(typed.double_value),
            (WireField::Number, Conversion::Date) => Value::Date(date_from_days(typed.number_value)?),
            (WireField::Number, Conversion::Time) => Value::Time(time_from_millis(typed.number_value)?),
            (WireField::Number, Conversion::Timestamp) => {
                Value::Timestamp(timestamp_from_millis(typed.number_value)?)
            }
            (WireField::Number, _) => Value::Int(typed.number_value),
        };
        Ok(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterType {
    pub value: ValueType,
    pub is_array: bool,
}

impl ParameterType {
    pub fn for_parameter(parameter: &AvaticaParameter) -> Result<Self> {
        let code = jdbc_code(parameter.parameter_type);
        let array_base = parameter
            .type_name
            .trim()
            .strip_suffix(" ARRAY")
            .and_then(jdbc_for_type_name);
        let (component, is_array) = if is_phoenix_array(code) {
            (code - PHOENIX_ARRAY_BASE, true)
        } else if code == JDBC_ARRAY {
            let component = array_base.ok_or_else(|| {
                AvaticaError::interface(format!(
                    "array parameter {} has no known component type",
                    parameter.type_name
                ))
            })?;
            (component, true)
        } else {
            (code, false)
        };
        Ok(Self {
            value: ValueType::from_jdbc(component)?,
            is_array,
        })
    }
}

fn is_phoenix_array(code: i32) -> bool {
    code > PHOENIX_ARRAY_BASE - 100 && code < PHOENIX_ARRAY_BASE + 100
}

enum Scalar {
    Bool(bool),
    String(String),
    Number(i64),
    Bytes(Vec<u8>),
    Double(f64),
}

impl Scalar {
    fn into_typed(self, rep: Rep) -> TypedValue {
        let mut typed = TypedValue {
            r#type: rep as i32,
            ..Default::default()
        };
        match self {
            Scalar::Bool(v) => typed.bool_value = v,
            Scalar::String(v) => typed.string_value = v,
            Scalar::Number(v) => typed.number_value = v,
            Scalar::Bytes(v) => typed.bytes_value = v,
            Scalar::Double(v) => typed.double_value = v,
        }
        typed
    }
}

/// Encodes one bind parameter. Nulls become null `TypedValue`s at any level.
pub fn encode_parameter(value: &Value, parameter: &ParameterType) -> Result<TypedValue> {
    if value.is_null() {
        return Ok(TypedValue::null());
    }
    let ty = &parameter.value;
    if !parameter.is_array {
        return Ok(ty.to_wire(value)?.into_typed(ty.rep));
    }
    let Value::Array(items) = value else {
        return Err(AvaticaError::programming(
            "Scalar value specified for array parameter.",
        ));
    };
    let array_value = items
        .iter()
        .map(|item| {
            if item.is_null() {
                Ok(TypedValue::null())
            } else {
                Ok(ty.to_wire(item)?.into_typed(ty.rep))
            }
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(TypedValue {
        r#type: Rep::Array as i32,
        array_value,
        component_type: ty.rep as i32,
        ..Default::default()
    })
}

pub fn encode_parameters(values: &[Value], parameters: &[ParameterType]) -> Result<Vec<TypedValue>> {
    if values.len() != parameters.len() {
        return Err(AvaticaError::programming(format!(
            "Expected {} parameters, got {}",
            parameters.len(),
            values.len()
        )));
    }
    values
        .iter()
        .zip(parameters)
        .map(|(value, parameter)| encode_parameter(value, parameter))
        .collect()
}

pub fn decode_column(column: &ColumnValue, ty: &ValueType) -> Result<Value> {
    if column.has_array_value {
        let items = column
            .array_value
            .iter()
            .map(|item| ty.from_wire(item))
            .collect::<Result<Vec<_>>>()?;
        return Ok(Value::Array(items));
    }
    // Servers before Avatica 1.7 only fill the repeated `value` field.
    match column.scalar_value.as_ref().or_else(|| column.value.first()) {
        Some(typed) => ty.from_wire(typed),
        None => Ok(Value::Null),
    }
}

pub fn decode_row(row: &Row, columns: &[ValueType]) -> Result<DataRow> {
    if row.value.len() > columns.len() {
        return Err(AvaticaError::interface(format!(
            "row carries {} values for {} columns",
            row.value.len(),
            columns.len()
        )));
    }
    row.value
        .iter()
        .zip(columns)
        .map(|(column, ty)| decode_column(column, ty))
        .collect()
}

fn days_since_epoch(date: NaiveDate) -> i64 {
    i64::from(date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE)
}

fn millis_since_midnight(time: NaiveTime) -> i64 {
    i64::from(time.num_seconds_from_midnight()) * 1000 + i64::from(time.nanosecond() / 1_000_000)
}

fn date_from_days(days: i64) -> Result<NaiveDate> {
    i32::try_from(days)
        .ok()
        .and_then(|days| days.checked_add(UNIX_EPOCH_DAYS_FROM_CE))
        .and_then(NaiveDate::from_num_days_from_ce_opt)
        .ok_or_else(|| out_of_range("date", days))
}

fn time_from_millis(millis: i64) -> Result<NaiveTime> {
    let millis = millis.rem_euclid(MILLIS_PER_DAY);
    NaiveTime::from_num_seconds_from_midnight_opt(
        (millis / 1000) as u32,
        ((millis % 1000) * 1_000_000) as u32,
    )
    .ok_or_else(|| out_of_range("time", millis))
}

fn timestamp_from_millis(millis: i64) -> Result<NaiveDateTime> {
    DateTime::from_timestamp_millis(millis)
        .map(|timestamp| timestamp.naive_utc())
        .ok_or_else(|| out_of_range("timestamp", millis))
}

fn out_of_range(kind: &str, raw: i64) -> AvaticaError {
    AvaticaError::Data(SqlErrorInfo::message(format!("{kind} value {raw} is out of range")))
}
