//! Method and type signatures (ECMA-335 II.23.2).
//!
//! Only what custom attribute decoding needs is modelled: the parameter types of attribute
//! constructors and the field signatures of enum types. Array shapes, function pointers and
//! generic instantiations are parsed so the signature is consumed correctly, then collapsed.

use crate::{
    file::parser::Parser,
    metadata::{
        tables::{CodedIndex, CodedIndexType},
        token::Token,
    },
    Result,
};

/// Nesting limit of type signatures
const MAX_DEPTH: usize = 64;

/// `CorElementType` values
#[allow(non_snake_case, missing_docs)]
pub mod ELEMENT_TYPE {
    pub const VOID: u8 = 0x01;
    pub const BOOLEAN: u8 = 0x02;
    pub const CHAR: u8 = 0x03;
    pub const I1: u8 = 0x04;
    pub const U1: u8 = 0x05;
    pub const I2: u8 = 0x06;
    pub const U2: u8 = 0x07;
    pub const I4: u8 = 0x08;
    pub const U4: u8 = 0x09;
    pub const I8: u8 = 0x0A;
    pub const U8: u8 = 0x0B;
    pub const R4: u8 = 0x0C;
    pub const R8: u8 = 0x0D;
    pub const STRING: u8 = 0x0E;
    pub const PTR: u8 = 0x0F;
    pub const BYREF: u8 = 0x10;
    pub const VALUETYPE: u8 = 0x11;
    pub const CLASS: u8 = 0x12;
    pub const VAR: u8 = 0x13;
    pub const ARRAY: u8 = 0x14;
    pub const GENERICINST: u8 = 0x15;
    pub const TYPEDBYREF: u8 = 0x16;
    pub const I: u8 = 0x18;
    pub const U: u8 = 0x19;
    pub const FNPTR: u8 = 0x1B;
    pub const OBJECT: u8 = 0x1C;
    pub const SZARRAY: u8 = 0x1D;
    pub const MVAR: u8 = 0x1E;
    pub const CMOD_REQD: u8 = 0x1F;
    pub const CMOD_OPT: u8 = 0x20;
    pub const SENTINEL: u8 = 0x41;
    pub const PINNED: u8 = 0x45;
}

/// A decoded type
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum TypeSignature {
    Void,
    Boolean,
    Char,
    I1,
    U1,
    I2,
    U2,
    I4,
    U4,
    I8,
    U8,
    R4,
    R8,
    I,
    U,
    String,
    Object,
    TypedByRef,
    /// A value type, usually an enum in attribute signatures
    ValueType(Token),
    /// A reference type
    Class(Token),
    /// Single dimension, zero based array
    SzArray(Box<TypeSignature>),
    /// Multi dimensional array
    Array(Box<TypeSignature>),
    /// Generic instantiation, with the generic type definition
    GenericInst(Box<TypeSignature>, Vec<TypeSignature>),
    /// Generic parameter of the type (`!n`) or method (`!!n`)
    GenericParam(u32),
    /// Pointer, by-ref or function pointer
    Pointer,
}

/// A decoded `MethodDefSig` or `MethodRefSig`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureMethod {
    /// `HASTHIS`
    pub has_this: bool,
    /// Number of generic parameters
    pub generic_param_count: u32,
    /// Return type
    pub return_type: TypeSignature,
    /// Parameter types, without the vararg part
    pub params: Vec<TypeSignature>,
}

/// Field signature prolog
const FIELD: u8 = 0x06;
/// `HASTHIS` calling convention flag
const HAS_THIS: u8 = 0x20;
/// `GENERIC` calling convention flag
const GENERIC: u8 = 0x10;

/// Decoder for signature blobs
pub struct SignatureParser<'a> {
    parser: Parser<'a>,
    depth: usize,
}

impl<'a> SignatureParser<'a> {
    /// Create a parser over a signature blob
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        SignatureParser {
            parser: Parser::new(data),
            depth: 0,
        }
    }

    /// Decode a method signature.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] or [`crate::Error::OutOfBounds`] for a damaged blob.
    pub fn parse_method_signature(&mut self) -> Result<SignatureMethod> {
        let convention = self.parser.read_le::<u8>()?;
        if convention & 0x0F == FIELD {
            return Err(malformed_error!("Field signature where a method was expected"));
        }

        let generic_param_count = if convention & GENERIC != 0 {
            self.parser.read_compressed_uint()?
        } else {
            0
        };

        let param_count = self.parser.read_compressed_uint()?;
        let return_type = self.parse_type()?;

        let mut params = Vec::new();
        for _ in 0..param_count {
            if self.parser.peek_byte()? == ELEMENT_TYPE::SENTINEL {
                break;
            }
            params.push(self.parse_type()?);
        }

        Ok(SignatureMethod {
            has_this: convention & HAS_THIS != 0,
            generic_param_count,
            return_type,
            params,
        })
    }

    /// Decode a field signature.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] or [`crate::Error::OutOfBounds`] for a damaged blob.
    pub fn parse_field_signature(&mut self) -> Result<TypeSignature> {
        let prolog = self.parser.read_le::<u8>()?;
        if prolog != FIELD {
            return Err(malformed_error!("Invalid field signature prolog - 0x{:02X}", prolog));
        }

        self.parse_type()
    }

    /// Decode one type.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for unknown element types or excessive nesting.
    pub fn parse_type(&mut self) -> Result<TypeSignature> {
        if self.depth >= MAX_DEPTH {
            return Err(malformed_error!("Signature nesting exceeds {}", MAX_DEPTH));
        }

        self.depth += 1;
        let result = self.parse_type_inner();
        self.depth -= 1;
        result
    }

    fn parse_type_inner(&mut self) -> Result<TypeSignature> {
        let element = self.parser.read_le::<u8>()?;
        Ok(match element {
            ELEMENT_TYPE::VOID => TypeSignature::Void,
            ELEMENT_TYPE::BOOLEAN => TypeSignature::Boolean,
            ELEMENT_TYPE::CHAR => TypeSignature::Char,
            ELEMENT_TYPE::I1 => TypeSignature::I1,
            ELEMENT_TYPE::U1 => TypeSignature::U1,
            ELEMENT_TYPE::I2 => TypeSignature::I2,
            ELEMENT_TYPE::U2 => TypeSignature::U2,
            ELEMENT_TYPE::I4 => TypeSignature::I4,
            ELEMENT_TYPE::U4 => TypeSignature::U4,
            ELEMENT_TYPE::I8 => TypeSignature::I8,
            ELEMENT_TYPE::U8 => TypeSignature::U8,
            ELEMENT_TYPE::R4 => TypeSignature::R4,
            ELEMENT_TYPE::R8 => TypeSignature::R8,
            ELEMENT_TYPE::I => TypeSignature::I,
            ELEMENT_TYPE::U => TypeSignature::U,
            ELEMENT_TYPE::STRING => TypeSignature::String,
            ELEMENT_TYPE::OBJECT => TypeSignature::Object,
            ELEMENT_TYPE::TYPEDBYREF => TypeSignature::TypedByRef,
            ELEMENT_TYPE::VALUETYPE => TypeSignature::ValueType(self.read_type_token()?),
            ELEMENT_TYPE::CLASS => TypeSignature::Class(self.read_type_token()?),
            ELEMENT_TYPE::VAR | ELEMENT_TYPE::MVAR => {
                TypeSignature::GenericParam(self.parser.read_compressed_uint()?)
            }
            ELEMENT_TYPE::SZARRAY => TypeSignature::SzArray(Box::new(self.parse_type()?)),
            ELEMENT_TYPE::ARRAY => {
                let base = self.parse_type()?;
                self.skip_array_shape()?;
                TypeSignature::Array(Box::new(base))
            }
            ELEMENT_TYPE::GENERICINST => {
                let base = self.parse_type()?;
                let count = self.parser.read_compressed_uint()?;
                let mut arguments = Vec::new();
                for _ in 0..count {
                    arguments.push(self.parse_type()?);
                }
                TypeSignature::GenericInst(Box::new(base), arguments)
            }
            ELEMENT_TYPE::PTR | ELEMENT_TYPE::BYREF | ELEMENT_TYPE::PINNED => {
                self.parse_type()?;
                TypeSignature::Pointer
            }
            ELEMENT_TYPE::FNPTR => {
                self.parse_method_signature()?;
                TypeSignature::Pointer
            }
            ELEMENT_TYPE::CMOD_REQD | ELEMENT_TYPE::CMOD_OPT => {
                self.read_type_token()?;
                self.parse_type()?
            }
            _ => {
                return Err(malformed_error!(
                    "Unsupported ELEMENT_TYPE - 0x{:02X}",
                    element
                ))
            }
        })
    }

    /// `TypeDefOrRefOrSpecEncoded`
    fn read_type_token(&mut self) -> Result<Token> {
        let value = self.parser.read_compressed_uint()?;
        Ok(CodedIndex::decode(value, CodedIndexType::TypeDefOrRef)?.token())
    }

    fn skip_array_shape(&mut self) -> Result<()> {
        let _rank = self.parser.read_compressed_uint()?;
        let sizes = self.parser.read_compressed_uint()?;
        for _ in 0..sizes {
            self.parser.read_compressed_uint()?;
        }

        let bounds = self.parser.read_compressed_uint()?;
        for _ in 0..bounds {
            self.parser.read_compressed_uint()?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_constructor() {
        // instance void (string, valuetype TypeRef[2], bool[])
        #[rustfmt::skip]
        let data = [
            0x20, 0x03, 0x01,
            0x0E,
            0x11, 0x09,
            0x1D, 0x02,
        ];

        let signature = SignatureParser::new(&data).parse_method_signature().unwrap();
        assert!(signature.has_this);
        assert_eq!(signature.return_type, TypeSignature::Void);
        assert_eq!(
            signature.params,
            vec![
                TypeSignature::String,
                TypeSignature::ValueType(Token::new(0x0100_0002)),
                TypeSignature::SzArray(Box::new(TypeSignature::Boolean)),
            ]
        );
    }

    #[test]
    fn modifiers_and_generics() {
        // instance void (modreq(TypeRef[1]) int32, class TypeDef[3]<!0>, int32[,])
        #[rustfmt::skip]
        let data = [
            0x20, 0x03, 0x01,
            0x1F, 0x05, 0x08,
            0x15, 0x12, 0x0C, 0x01, 0x13, 0x00,
            0x14, 0x08, 0x02, 0x00, 0x00,
        ];

        let signature = SignatureParser::new(&data).parse_method_signature().unwrap();
        assert_eq!(signature.params[0], TypeSignature::I4);
        assert_eq!(
            signature.params[1],
            TypeSignature::GenericInst(
                Box::new(TypeSignature::Class(Token::new(0x0200_0003))),
                vec![TypeSignature::GenericParam(0)]
            )
        );
        assert_eq!(
            signature.params[2],
            TypeSignature::Array(Box::new(TypeSignature::I4))
        );
    }

    #[test]
    fn field() {
        let mut parser = SignatureParser::new(&[0x06, 0x08]);
        assert_eq!(parser.parse_field_signature().unwrap(), TypeSignature::I4);

        if SignatureParser::new(&[0x06, 0x08])
            .parse_method_signature()
            .is_ok()
        {
            panic!("This should not work!")
        }
    }

    #[test]
    fn malformed() {
        assert!(SignatureParser::new(&[0x00, 0x01, 0x01, 0x42])
            .parse_method_signature()
            .is_err());
        assert!(SignatureParser::new(&[0x00, 0x02, 0x01, 0x08])
            .parse_method_signature()
            .is_err());

        let nested = vec![ELEMENT_TYPE::SZARRAY; 100];
        assert!(SignatureParser::new(&nested).parse_type().is_err());
    }
}
