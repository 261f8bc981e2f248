use std::fmt;

macro_rules! column_type {
    ($($name:ident = $tag:literal => $sql:literal,)*) => {
        /// Column type tag of mysql wire protocol.
        ///
        /// <https://dev.mysql.com/doc/dev/mysql-server/latest/field__types_8h.html>
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum ColumnType {
            $($name = $tag,)*
        }

        impl ColumnType {
            /// Returns [`None`] for unknown tag.
            pub fn from_u8(tag: u8) -> Option<ColumnType> {
                match tag {
                    $($tag => Some(Self::$name),)*
                    _ => None,
                }
            }

            /// SQL name of the type.
            pub fn sql_name(&self) -> &'static str {
                match self {
                    $(Self::$name => $sql,)*
                }
            }
        }
    };
}

column_type! {
    Decimal = 0 => "DECIMAL",
    Tiny = 1 => "TINYINT",
    Short = 2 => "SMALLINT",
    Long = 3 => "INT",
    Float = 4 => "FLOAT",
    Double = 5 => "DOUBLE",
    Null = 6 => "NULL",
    Timestamp = 7 => "TIMESTAMP",
    LongLong = 8 => "BIGINT",
    Int24 = 9 => "MEDIUMINT",
    Date = 10 => "DATE",
    Time = 11 => "TIME",
    DateTime = 12 => "DATETIME",
    Year = 13 => "YEAR",
    VarChar = 15 => "VARCHAR",
    Bit = 16 => "BIT",
    Json = 245 => "JSON",
    NewDecimal = 246 => "DECIMAL",
    Enum = 247 => "ENUM",
    Set = 248 => "SET",
    TinyBlob = 249 => "TINYBLOB",
    MediumBlob = 250 => "MEDIUMBLOB",
    LongBlob = 251 => "LONGBLOB",
    Blob = 252 => "BLOB",
    VarString = 253 => "VARCHAR",
    String = 254 => "CHAR",
    Geometry = 255 => "GEOMETRY",
}

impl ColumnType {
    /// Integer column, including `YEAR`.
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            Self::Tiny | Self::Short | Self::Int24 | Self::Long | Self::LongLong | Self::Year
        )
    }

    /// Column that carries text or raw bytes.
    pub fn is_string(&self) -> bool {
        matches!(
            self,
            Self::VarChar
                | Self::VarString
                | Self::String
                | Self::TinyBlob
                | Self::MediumBlob
                | Self::LongBlob
                | Self::Blob
                | Self::Enum
                | Self::Set
                | Self::Json
                | Self::Decimal
                | Self::NewDecimal
                | Self::Bit
                | Self::Geometry
        )
    }

    /// Width in bytes of the binary protocol integer representation.
    pub fn binary_width(&self) -> Option<usize> {
        match self {
            Self::Tiny => Some(1),
            Self::Short | Self::Year => Some(2),
            Self::Int24 | Self::Long | Self::Float => Some(4),
            Self::LongLong | Self::Double => Some(8),
            _ => None,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql_name())
    }
}
