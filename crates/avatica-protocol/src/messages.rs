//! Messages shared by Avatica requests and responses (`common.proto`).

use prost::Message;

/// Wire representation kind of a value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum Rep {
    PrimitiveBoolean = 0,
    PrimitiveByte = 1,
    PrimitiveChar = 2,
    PrimitiveShort = 3,
    PrimitiveInt = 4,
    PrimitiveLong = 5,
    PrimitiveFloat = 6,
    PrimitiveDouble = 7,
    Boolean = 8,
    Byte = 9,
    Character = 10,
    Short = 11,
    Integer = 12,
    Long = 13,
    Float = 14,
    Double = 15,
    JavaSqlTime = 16,
    JavaSqlTimestamp = 17,
    JavaSqlDate = 18,
    JavaUtilDate = 19,
    ByteString = 20,
    String = 21,
    Number = 22,
    Object = 23,
    Null = 24,
    BigInteger = 25,
    BigDecimal = 26,
    Array = 27,
    Struct = 28,
    Multiset = 29,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum Severity {
    UnknownSeverity = 0,
    FatalSeverity = 1,
    ErrorSeverity = 2,
    WarningSeverity = 3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum StatementType {
    Select = 0,
    Insert = 1,
    Update = 2,
    Delete = 3,
    Upsert = 4,
    Merge = 5,
    OtherDml = 6,
    Create = 7,
    Drop = 8,
    Alter = 9,
    OtherDdl = 10,
    Call = 11,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum CursorStyle {
    Object = 0,
    Record = 1,
    RecordProjection = 2,
    Array = 3,
    List = 4,
    Map = 5,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum MetaDataOperation {
    GetAttributes = 0,
    GetBestRowIdentifier = 1,
    GetCatalogs = 2,
    GetClientInfoProperties = 3,
    GetColumnPrivileges = 4,
    GetColumns = 5,
    GetCrossReference = 6,
    GetExportedKeys = 7,
    GetFunctionColumns = 8,
    GetFunctions = 9,
    GetImportedKeys = 10,
    GetIndexInfo = 11,
    GetPrimaryKeys = 12,
    GetProcedureColumns = 13,
    GetProcedures = 14,
    GetPseudoColumns = 15,
    GetSchemas = 16,
    GetSchemasWithArgs = 17,
    GetSuperTables = 18,
    GetSuperTypes = 19,
    GetTablePrivileges = 20,
    GetTables = 21,
    GetTableTypes = 22,
    GetTypeInfo = 23,
    GetUdts = 24,
    GetVersionColumns = 25,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum ArgumentType {
    String = 0,
    Bool = 1,
    Int = 2,
    RepeatedString = 3,
    RepeatedInt = 4,
    Null = 5,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum StateType {
    Sql = 0,
    Metadata = 1,
}

/// Outer envelope of every request and response body.
#[derive(Clone, PartialEq, Message)]
pub struct WireMessage {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(bytes = "vec", tag = "2")]
    pub wrapped_message: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub struct ConnectionProperties {
    #[prost(bool, tag = "1")]
    pub is_dirty: bool,
    #[prost(bool, tag = "2")]
    pub auto_commit: bool,
    #[prost(bool, tag = "7")]
    pub has_auto_commit: bool,
    #[prost(bool, tag = "3")]
    pub read_only: bool,
    #[prost(bool, tag = "8")]
    pub has_read_only: bool,
    #[prost(uint32, tag = "4")]
    pub transaction_isolation: u32,
    #[prost(string, tag = "5")]
    pub catalog: String,
    #[prost(string, tag = "6")]
    pub schema: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct StatementHandle {
    #[prost(string, tag = "1")]
    pub connection_id: String,
    #[prost(uint32, tag = "2")]
    pub id: u32,
    #[prost(message, optional, tag = "3")]
    pub signature: Option<Signature>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Signature {
    #[prost(message, repeated, tag = "1")]
    pub columns: Vec<ColumnMetaData>,
    #[prost(string, tag = "2")]
    pub sql: String,
    #[prost(message, repeated, tag = "3")]
    pub parameters: Vec<AvaticaParameter>,
    #[prost(message, optional, tag = "4")]
    pub cursor_factory: Option<CursorFactory>,
    #[prost(enumeration = "StatementType", tag = "5")]
    pub statement_type: i32,
}

#[derive(Clone, PartialEq, Message)]
pub struct ColumnMetaData {
    #[prost(uint32, tag = "1")]
    pub ordinal: u32,
    #[prost(bool, tag = "2")]
    pub auto_increment: bool,
    #[prost(bool, tag = "3")]
    pub case_sensitive: bool,
    #[prost(bool, tag = "4")]
    pub searchable: bool,
    #[prost(bool, tag = "5")]
    pub currency: bool,
    /// 0 = no nulls, 1 = nullable, 2 = unknown.
    #[prost(uint32, tag = "6")]
    pub nullable: u32,
    #[prost(bool, tag = "7")]
    pub signed: bool,
    #[prost(uint32, tag = "8")]
    pub display_size: u32,
    #[prost(string, tag = "9")]
    pub label: String,
    #[prost(string, tag = "10")]
    pub column_name: String,
    #[prost(string, tag = "11")]
    pub schema_name: String,
    #[prost(uint32, tag = "12")]
    pub precision: u32,
    #[prost(uint32, tag = "13")]
    pub scale: u32,
    #[prost(string, tag = "14")]
    pub table_name: String,
    #[prost(string, tag = "15")]
    pub catalog_name: String,
    #[prost(bool, tag = "16")]
    pub read_only: bool,
    #[prost(bool, tag = "17")]
    pub writable: bool,
    #[prost(bool, tag = "18")]
    pub definitely_writable: bool,
    #[prost(string, tag = "19")]
    pub column_class_name: String,
    #[prost(message, optional, tag = "20")]
    pub r#type: Option<AvaticaType>,
}

#[derive(Clone, PartialEq, Message)]
pub struct AvaticaType {
    /// JDBC type code.
    #[prost(uint32, tag = "1")]
    pub id: u32,
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(enumeration = "Rep", tag = "3")]
    pub rep: i32,
    #[prost(message, repeated, tag = "4")]
    pub columns: Vec<ColumnMetaData>,
    #[prost(message, optional, boxed, tag = "5")]
    pub component: Option<Box<AvaticaType>>,
}

#[derive(Clone, PartialEq, Message)]
pub struct AvaticaParameter {
    #[prost(bool, tag = "1")]
    pub signed: bool,
    #[prost(uint32, tag = "2")]
    pub precision: u32,
    #[prost(uint32, tag = "3")]
    pub scale: u32,
    /// JDBC type code.
    #[prost(uint32, tag = "4")]
    pub parameter_type: u32,
    #[prost(string, tag = "5")]
    pub type_name: String,
    #[prost(string, tag = "6")]
    pub class_name: String,
    #[prost(string, tag = "7")]
    pub name: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct CursorFactory {
    #[prost(enumeration = "CursorStyle", tag = "1")]
    pub style: i32,
    #[prost(string, tag = "2")]
    pub class_name: String,
    #[prost(string, repeated, tag = "3")]
    pub field_names: Vec<String>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Frame {
    #[prost(uint64, tag = "1")]
    pub offset: u64,
    #[prost(bool, tag = "2")]
    pub done: bool,
    #[prost(message, repeated, tag = "3")]
    pub rows: Vec<Row>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Row {
    #[prost(message, repeated, tag = "1")]
    pub value: Vec<ColumnValue>,
}

#[derive(Clone, PartialEq, Message)]
pub struct DatabaseProperty {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, repeated, tag = "2")]
    pub functions: Vec<String>,
}

#[derive(Clone, PartialEq, Message)]
pub struct ColumnValue {
    /// Deprecated in favour of `scalar_value` / `array_value`.
    #[prost(message, repeated, tag = "1")]
    pub value: Vec<TypedValue>,
    #[prost(message, repeated, tag = "2")]
    pub array_value: Vec<TypedValue>,
    #[prost(bool, tag = "3")]
    pub has_array_value: bool,
    #[prost(message, optional, tag = "4")]
    pub scalar_value: Option<TypedValue>,
}

#[derive(Clone, PartialEq, Message)]
pub struct TypedValue {
    #[prost(enumeration = "Rep", tag = "1")]
    pub r#type: i32,
    #[prost(bool, tag = "2")]
    pub bool_value: bool,
    #[prost(string, tag = "3")]
    pub string_value: String,
    #[prost(sint64, tag = "4")]
    pub number_value: i64,
    #[prost(bytes = "vec", tag = "5")]
    pub bytes_value: Vec<u8>,
    #[prost(double, tag = "6")]
    pub double_value: f64,
    #[prost(bool, tag = "7")]
    pub null: bool,
    #[prost(message, repeated, tag = "8")]
    pub array_value: Vec<TypedValue>,
    #[prost(enumeration = "Rep", tag = "9")]
    pub component_type: i32,
    #[prost(bool, tag = "10")]
    pub implicitly_null: bool,
}

impl TypedValue {
    pub fn null() -> Self {
        Self {
            r#type: Rep::Null as i32,
            null: true,
            ..Default::default()
        }
    }

    pub fn rep(&self) -> Option<Rep> {
        Rep::try_from(self.r#type).ok()
    }
}

#[derive(Clone, PartialEq, Message)]
pub struct MetaDataOperationArgument {
    #[prost(string, tag = "1")]
    pub string_value: String,
    #[prost(bool, tag = "2")]
    pub bool_value: bool,
    #[prost(sint32, tag = "3")]
    pub int_value: i32,
    #[prost(string, repeated, tag = "4")]
    pub string_array_values: Vec<String>,
    #[prost(sint32, repeated, tag = "5")]
    pub int_array_values: Vec<i32>,
    #[prost(enumeration = "ArgumentType", tag = "6")]
    pub r#type: i32,
}

impl MetaDataOperationArgument {
    pub fn string(value: Option<&str>) -> Self {
        match value {
            Some(value) => Self {
                string_value: value.to_string(),
                r#type: ArgumentType::String as i32,
                ..Default::default()
            },
            None => Self::null(),
        }
    }

    pub fn boolean(value: Option<bool>) -> Self {
        match value {
            Some(value) => Self {
                bool_value: value,
                r#type: ArgumentType::Bool as i32,
                ..Default::default()
            },
            None => Self::null(),
        }
    }

    pub fn null() -> Self {
        Self {
            r#type: ArgumentType::Null as i32,
            ..Default::default()
        }
    }
}

#[derive(Clone, PartialEq, Message)]
pub struct QueryState {
    #[prost(enumeration = "StateType", tag = "1")]
    pub r#type: i32,
    #[prost(string, tag = "2")]
    pub sql: String,
    #[prost(enumeration = "MetaDataOperation", tag = "3")]
    pub op: i32,
    #[prost(message, repeated, tag = "4")]
    pub args: Vec<MetaDataOperationArgument>,
    #[prost(bool, tag = "5")]
    pub has_args: bool,
    #[prost(bool, tag = "6")]
    pub has_sql: bool,
    #[prost(bool, tag = "7")]
    pub has_op: bool,
}

impl QueryState {
    pub fn metadata(op: MetaDataOperation, args: Vec<MetaDataOperationArgument>) -> Self {
        Self {
            r#type: StateType::Metadata as i32,
            op: op as i32,
            args,
            has_args: true,
            has_op: true,
            ..Default::default()
        }
    }
}
