//! Custom attribute value blobs (ECMA-335 II.23.3).
//!
//! A value blob starts with the prolog `0x0001`, followed by the fixed arguments in the order of
//! the constructor parameters and a counted list of named field or property arguments. Fixed
//! arguments carry no type information of their own, so enum parameters need the underlying
//! integer type of the enum, which a [`TypeResolver`] supplies. Attributes whose types cannot be
//! resolved fail with [`crate::Error::UnresolvedType`].

use std::fmt;

use crate::{
    file::parser::Parser,
    metadata::{signatures::TypeSignature, token::Token},
    Error, Result,
};

/// Custom attribute prolog
const PROLOG: u16 = 0x0001;

/// `FIELD` marker of a named argument
const NAMED_FIELD: u8 = 0x53;
/// `PROPERTY` marker of a named argument
const NAMED_PROPERTY: u8 = 0x54;

/// Serialization type tags of named arguments and boxed values
const SERIALIZATION_TYPE_SZARRAY: u8 = 0x1D;
const SERIALIZATION_TYPE_TYPE: u8 = 0x50;
const SERIALIZATION_TYPE_TAGGED_OBJECT: u8 = 0x51;
const SERIALIZATION_TYPE_ENUM: u8 = 0x55;

/// Resolves the types referenced by attribute signatures
pub trait TypeResolver {
    /// Full name of the TypeDef or TypeRef behind `token`.
    ///
    /// # Errors
    /// Returns an error if the token does not reference a readable type row.
    fn type_name(&self, token: Token) -> Result<String>;

    /// Underlying integer type of the enum behind `token`, `None` if it cannot be determined.
    ///
    /// # Errors
    /// Returns an error if the type rows are damaged.
    fn enum_underlying_type(&self, token: Token) -> Result<Option<TypeSignature>>;

    /// Underlying integer type of the enum with the serialized name `name`.
    ///
    /// # Errors
    /// Returns an error if the type rows are damaged.
    fn enum_underlying_type_by_name(&self, name: &str) -> Result<Option<TypeSignature>>;
}

/// A decoded argument value
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum CustomAttributeArgument {
    Bool(bool),
    Char(char),
    I1(i8),
    U1(u8),
    I2(i16),
    U2(u16),
    I4(i32),
    U4(u32),
    I8(i64),
    U8(u64),
    R4(f32),
    R8(f64),
    /// A string, `None` for the null string
    String(Option<String>),
    /// A `System.Type` given by its serialized name
    Type(Option<String>),
    /// A single dimension array, `None` for the null array
    Array(Option<Vec<CustomAttributeArgument>>),
    /// An enum value with the enum type name
    Enum(String, Box<CustomAttributeArgument>),
}

impl fmt::Display for CustomAttributeArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CustomAttributeArgument::Bool(value) => write!(f, "{value}"),
            CustomAttributeArgument::Char(value) => write!(f, "{value}"),
            CustomAttributeArgument::I1(value) => write!(f, "{value}"),
            CustomAttributeArgument::U1(value) => write!(f, "{value}"),
            CustomAttributeArgument::I2(value) => write!(f, "{value}"),
            CustomAttributeArgument::U2(value) => write!(f, "{value}"),
            CustomAttributeArgument::I4(value) => write!(f, "{value}"),
            CustomAttributeArgument::U4(value) => write!(f, "{value}"),
            CustomAttributeArgument::I8(value) => write!(f, "{value}"),
            CustomAttributeArgument::U8(value) => write!(f, "{value}"),
            CustomAttributeArgument::R4(value) => write!(f, "{value}"),
            CustomAttributeArgument::R8(value) => write!(f, "{value}"),
            CustomAttributeArgument::String(Some(value))
            | CustomAttributeArgument::Type(Some(value)) => f.write_str(value),
            CustomAttributeArgument::String(None)
            | CustomAttributeArgument::Type(None)
            | CustomAttributeArgument::Array(None) => f.write_str("null"),
            CustomAttributeArgument::Array(Some(values)) => {
                f.write_str("[")?;
                for (index, value) in values.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str("]")
            }
            CustomAttributeArgument::Enum(_, value) => write!(f, "{value}"),
        }
    }
}

/// A named field or property argument
#[derive(Debug, Clone, PartialEq)]
pub struct CustomAttributeNamedArgument {
    /// `true` for a field, `false` for a property
    pub is_field: bool,
    /// Name of the field or property
    pub name: String,
    /// The value
    pub value: CustomAttributeArgument,
}

/// A decoded custom attribute value blob
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CustomAttributeValue {
    /// Constructor arguments in parameter order
    pub fixed_args: Vec<CustomAttributeArgument>,
    /// Field and property assignments
    pub named_args: Vec<CustomAttributeNamedArgument>,
}

impl fmt::Display for CustomAttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for value in &self.fixed_args {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{value}")?;
        }

        for named in &self.named_args {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{}={}", named.name, named.value)?;
        }

        Ok(())
    }
}

/// The type of one serialized value
#[derive(Debug, Clone)]
enum ArgumentType {
    Primitive(TypeSignature),
    String,
    Type,
    Boxed,
    Enum(String, TypeSignature),
    SzArray(Box<ArgumentType>),
}

/// Decode a custom attribute value blob for a constructor with parameter types `params`.
///
/// # Errors
/// Returns [`Error::UnresolvedType`] if a parameter type cannot be decoded, or
/// [`Error::Malformed`] / [`Error::OutOfBounds`] for a damaged blob.
pub fn parse_custom_attribute(
    data: &[u8],
    params: &[TypeSignature],
    resolver: &dyn TypeResolver,
) -> Result<CustomAttributeValue> {
    if data.is_empty() {
        if params.is_empty() {
            return Ok(CustomAttributeValue::default());
        }
        return Err(malformed_error!("Empty custom attribute blob for {} arguments", params.len()));
    }

    let mut parser = CustomAttributeParser {
        parser: Parser::new(data),
        resolver,
    };

    let prolog = parser.parser.read_le::<u16>()?;
    if prolog != PROLOG {
        return Err(malformed_error!("Invalid custom attribute prolog - 0x{:04X}", prolog));
    }

    let mut fixed_args = Vec::with_capacity(params.len());
    for param in params {
        let arg_type = parser.argument_type(param)?;
        fixed_args.push(parser.parse_value(&arg_type)?);
    }

    let mut named_args = Vec::new();
    if parser.parser.has_more_data() {
        let count = parser.parser.read_le::<u16>()?;
        for _ in 0..count {
            named_args.push(parser.parse_named_argument()?);
        }
    }

    Ok(CustomAttributeValue {
        fixed_args,
        named_args,
    })
}

struct CustomAttributeParser<'a, 'r> {
    parser: Parser<'a>,
    resolver: &'r dyn TypeResolver,
}

impl CustomAttributeParser<'_, '_> {
    /// Map a constructor parameter type to its serialized form
    fn argument_type(&self, signature: &TypeSignature) -> Result<ArgumentType> {
        Ok(match signature {
            TypeSignature::Boolean
            | TypeSignature::Char
            | TypeSignature::I1
            | TypeSignature::U1
            | TypeSignature::I2
            | TypeSignature::U2
            | TypeSignature::I4
            | TypeSignature::U4
            | TypeSignature::I8
            | TypeSignature::U8
            | TypeSignature::R4
            | TypeSignature::R8 => ArgumentType::Primitive(signature.clone()),
            TypeSignature::String => ArgumentType::String,
            TypeSignature::Object => ArgumentType::Boxed,
            TypeSignature::SzArray(element) => {
                ArgumentType::SzArray(Box::new(self.argument_type(element)?))
            }
            TypeSignature::Class(token) => {
                let name = self.resolver.type_name(*token)?;
                if name != "System.Type" {
                    return Err(Error::UnresolvedType(name));
                }
                ArgumentType::Type
            }
            TypeSignature::ValueType(token) => {
                let name = self.resolver.type_name(*token)?;
                match self.resolver.enum_underlying_type(*token)? {
                    Some(underlying) => ArgumentType::Enum(name, underlying),
                    None => return Err(Error::UnresolvedType(name)),
                }
            }
            other => return Err(Error::UnresolvedType(format!("{other:?}"))),
        })
    }

    /// Read a `FieldOrPropType`
    fn serialized_type(&mut self) -> Result<ArgumentType> {
        let tag = self.parser.read_le::<u8>()?;
        Ok(match tag {
            0x02 => ArgumentType::Primitive(TypeSignature::Boolean),
            0x03 => ArgumentType::Primitive(TypeSignature::Char),
            0x04 => ArgumentType::Primitive(TypeSignature::I1),
            0x05 => ArgumentType::Primitive(TypeSignature::U1),
            0x06 => ArgumentType::Primitive(TypeSignature::I2),
            0x07 => ArgumentType::Primitive(TypeSignature::U2),
            0x08 => ArgumentType::Primitive(TypeSignature::I4),
            0x09 => ArgumentType::Primitive(TypeSignature::U4),
            0x0A => ArgumentType::Primitive(TypeSignature::I8),
            0x0B => ArgumentType::Primitive(TypeSignature::U8),
            0x0C => ArgumentType::Primitive(TypeSignature::R4),
            0x0D => ArgumentType::Primitive(TypeSignature::R8),
            0x0E => ArgumentType::String,
            SERIALIZATION_TYPE_SZARRAY => {
                ArgumentType::SzArray(Box::new(self.serialized_type()?))
            }
            SERIALIZATION_TYPE_TYPE => ArgumentType::Type,
            SERIALIZATION_TYPE_TAGGED_OBJECT => ArgumentType::Boxed,
            SERIALIZATION_TYPE_ENUM => {
                let Some(name) = self.read_ser_string()? else {
                    return Err(malformed_error!("Enum argument without a type name"));
                };
                match self.resolver.enum_underlying_type_by_name(&name)? {
                    Some(underlying) => ArgumentType::Enum(name, underlying),
                    None => return Err(Error::UnresolvedType(name)),
                }
            }
            _ => {
                return Err(malformed_error!(
                    "Invalid serialization type - 0x{:02X}",
                    tag
                ))
            }
        })
    }

    fn parse_named_argument(&mut self) -> Result<CustomAttributeNamedArgument> {
        let kind = self.parser.read_le::<u8>()?;
        let is_field = match kind {
            NAMED_FIELD => true,
            NAMED_PROPERTY => false,
            _ => {
                return Err(malformed_error!(
                    "Invalid named argument kind - 0x{:02X}",
                    kind
                ))
            }
        };

        let arg_type = self.serialized_type()?;
        let Some(name) = self.read_ser_string()? else {
            return Err(malformed_error!("Named argument without a name"));
        };
        let value = self.parse_value(&arg_type)?;

        Ok(CustomAttributeNamedArgument {
            is_field,
            name,
            value,
        })
    }

    fn parse_value(&mut self, arg_type: &ArgumentType) -> Result<CustomAttributeArgument> {
        Ok(match arg_type {
            ArgumentType::Primitive(primitive) => self.parse_primitive(primitive)?,
            ArgumentType::String => CustomAttributeArgument::String(self.read_ser_string()?),
            ArgumentType::Type => CustomAttributeArgument::Type(self.read_ser_string()?),
            ArgumentType::Boxed => {
                let inner = self.serialized_type()?;
                self.parse_value(&inner)?
            }
            ArgumentType::Enum(name, underlying) => CustomAttributeArgument::Enum(
                name.clone(),
                Box::new(self.parse_primitive(underlying)?),
            ),
            ArgumentType::SzArray(element) => {
                let count = self.parser.read_le::<u32>()?;
                if count == u32::MAX {
                    return Ok(CustomAttributeArgument::Array(None));
                }

                if count as usize > self.parser.remaining() {
                    return Err(out_of_bounds_error!());
                }

                let mut values = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    values.push(self.parse_value(element)?);
                }
                CustomAttributeArgument::Array(Some(values))
            }
        })
    }

    fn parse_primitive(&mut self, primitive: &TypeSignature) -> Result<CustomAttributeArgument> {
        Ok(match primitive {
            TypeSignature::Boolean => CustomAttributeArgument::Bool(self.parser.read_le::<u8>()? != 0),
            TypeSignature::Char => {
                let value = self.parser.read_le::<u16>()?;
                CustomAttributeArgument::Char(
                    char::from_u32(u32::from(value)).unwrap_or(char::REPLACEMENT_CHARACTER),
                )
            }
            TypeSignature::I1 => CustomAttributeArgument::I1(self.parser.read_le::<i8>()?),
            TypeSignature::U1 => CustomAttributeArgument::U1(self.parser.read_le::<u8>()?),
            TypeSignature::I2 => CustomAttributeArgument::I2(self.parser.read_le::<i16>()?),
            TypeSignature::U2 => CustomAttributeArgument::U2(self.parser.read_le::<u16>()?),
            TypeSignature::I4 => CustomAttributeArgument::I4(self.parser.read_le::<i32>()?),
            TypeSignature::U4 => CustomAttributeArgument::U4(self.parser.read_le::<u32>()?),
            TypeSignature::I8 => CustomAttributeArgument::I8(self.parser.read_le::<i64>()?),
            TypeSignature::U8 => CustomAttributeArgument::U8(self.parser.read_le::<u64>()?),
            TypeSignature::R4 => CustomAttributeArgument::R4(self.parser.read_le::<f32>()?),
            TypeSignature::R8 => CustomAttributeArgument::R8(self.parser.read_le::<f64>()?),
            other => return Err(Error::UnresolvedType(format!("{other:?}"))),
        })
    }

    /// `SerString`: `0xFF` for null, otherwise a compressed length and UTF-8 bytes
    fn read_ser_string(&mut self) -> Result<Option<String>> {
        if self.parser.peek_byte()? == 0xFF {
            self.parser.advance_by(1)?;
            return Ok(None);
        }

        self.parser.read_compressed_string_utf8().map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Resolver;

    impl TypeResolver for Resolver {
        fn type_name(&self, token: Token) -> Result<String> {
            match token.value() {
                0x0100_0001 => Ok("System.Type".to_string()),
                0x0200_0002 => Ok("Contoso.Level".to_string()),
                0x0100_0003 => Ok("Other.External".to_string()),
                _ => Err(malformed_error!("unknown")),
            }
        }

        fn enum_underlying_type(&self, token: Token) -> Result<Option<TypeSignature>> {
            Ok((token.value() == 0x0200_0002).then_some(TypeSignature::I4))
        }

        fn enum_underlying_type_by_name(&self, name: &str) -> Result<Option<TypeSignature>> {
            Ok((name == "Contoso.Level").then_some(TypeSignature::I4))
        }
    }

    #[test]
    fn string_argument() {
        #[rustfmt::skip]
        let data = [
            0x01, 0x00,
            0x05, b'1', b'.', b'2', b'.', b'3',
            0x00, 0x00,
        ];

        let value = parse_custom_attribute(&data, &[TypeSignature::String], &Resolver).unwrap();
        assert_eq!(
            value.fixed_args,
            vec![CustomAttributeArgument::String(Some("1.2.3".to_string()))]
        );
        assert!(value.named_args.is_empty());
        assert_eq!(value.to_string(), "1.2.3");
    }

    #[test]
    fn mixed_arguments() {
        #[rustfmt::skip]
        let data = [
            0x01, 0x00,
            // bool
            0x01,
            // enum Contoso.Level = 2
            0x02, 0x00, 0x00, 0x00,
            // System.Type
            0x0B, b'S', b'y', b's', b't', b'e', b'm', b'.', b'I', b'n', b't', b'1',
            // int32[] { 7 }
            0x01, 0x00, 0x00, 0x00, 0x07, 0x00, 0x00, 0x00,
            // null string
            0xFF,
            // object boxed as uint16
            0x07, 0x2A, 0x00,
            // 2 named arguments
            0x02, 0x00,
            0x54, 0x02, 0x08, b'A', b'l', b'l', b'o', b'w', b'M', b'e', b'!', 0x01,
            0x53, 0x55, 0x0D, b'C', b'o', b'n', b't', b'o', b's', b'o', b'.', b'L', b'e', b'v', b'e', b'l',
            0x05, b'L', b'e', b'v', b'e', b'l', 0x03, 0x00, 0x00, 0x00,
        ];

        let params = [
            TypeSignature::Boolean,
            TypeSignature::ValueType(Token::new(0x0200_0002)),
            TypeSignature::Class(Token::new(0x0100_0001)),
            TypeSignature::SzArray(Box::new(TypeSignature::I4)),
            TypeSignature::String,
            TypeSignature::Object,
        ];

        let value = parse_custom_attribute(&data, &params, &Resolver).unwrap();
        assert_eq!(value.fixed_args[0], CustomAttributeArgument::Bool(true));
        assert_eq!(
            value.fixed_args[1],
            CustomAttributeArgument::Enum(
                "Contoso.Level".to_string(),
                Box::new(CustomAttributeArgument::I4(2))
            )
        );
        assert_eq!(
            value.fixed_args[2],
            CustomAttributeArgument::Type(Some("System.Int1".to_string()))
        );
        assert_eq!(
            value.fixed_args[3],
            CustomAttributeArgument::Array(Some(vec![CustomAttributeArgument::I4(7)]))
        );
        assert_eq!(value.fixed_args[4], CustomAttributeArgument::String(None));
        assert_eq!(value.fixed_args[5], CustomAttributeArgument::U2(42));

        assert_eq!(value.named_args.len(), 2);
        assert!(!value.named_args[0].is_field);
        assert_eq!(value.named_args[0].name, "AllowMe!");
        assert_eq!(value.named_args[0].value, CustomAttributeArgument::Bool(true));
        assert!(value.named_args[1].is_field);
        assert_eq!(value.named_args[1].name, "Level");

        assert_eq!(
            value.to_string(),
            "true, 2, System.Int1, [7], null, 42, AllowMe!=true, Level=3"
        );
    }

    #[test]
    fn unresolved_enum() {
        let data = [0x01, 0x00, 0x01, 0x00, 0x00, 0x00];
        let params = [TypeSignature::ValueType(Token::new(0x0100_0003))];

        match parse_custom_attribute(&data, &params, &Resolver) {
            Err(Error::UnresolvedType(name)) => assert_eq!(name, "Other.External"),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn malformed() {
        assert!(parse_custom_attribute(&[0x02, 0x00], &[], &Resolver).is_err());
        assert!(parse_custom_attribute(&[0x01, 0x00, 0x01], &[TypeSignature::I4], &Resolver).is_err());
        assert!(parse_custom_attribute(&[], &[TypeSignature::I4], &Resolver).is_err());
        assert_eq!(
            parse_custom_attribute(&[], &[], &Resolver).unwrap(),
            CustomAttributeValue::default()
        );

        let huge_array = [0x01, 0x00, 0x00, 0x00, 0x00, 0x10];
        let params = [TypeSignature::SzArray(Box::new(TypeSignature::U1))];
        if parse_custom_attribute(&huge_array, &params, &Resolver).is_ok() {
            panic!("This should not work!")
        }
    }
}
