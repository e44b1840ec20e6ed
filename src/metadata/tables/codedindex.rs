use strum::{EnumCount, EnumIter};

use crate::{
    file::io::read_le_at_dyn,
    metadata::{
        tables::{TableId, TableInfo},
        token::Token,
    },
    Result,
};

/// Coded index kinds of ECMA-335 II.24.2.6 and the portable PDB extension
#[derive(Debug, Hash, Eq, PartialEq, Clone, Copy, EnumIter, EnumCount)]
#[repr(usize)]
pub enum CodedIndexType {
    /// TypeDef, TypeRef, TypeSpec
    TypeDefOrRef,
    /// Field, Param, Property
    HasConstant,
    /// Any table that can own a custom attribute
    HasCustomAttribute,
    /// Field, Param
    HasFieldMarshal,
    /// TypeDef, MethodDef, Assembly
    HasDeclSecurity,
    /// TypeDef, TypeRef, ModuleRef, MethodDef, TypeSpec
    MemberRefParent,
    /// Event, Property
    HasSemantics,
    /// MethodDef, MemberRef
    MethodDefOrRef,
    /// Field, MethodDef
    MemberForwarded,
    /// File, AssemblyRef, ExportedType
    Implementation,
    /// MethodDef (tag 2), MemberRef (tag 3)
    CustomAttributeType,
    /// Module, ModuleRef, AssemblyRef, TypeRef
    ResolutionScope,
    /// TypeDef, MethodDef
    TypeOrMethodDef,
    /// Any table that can own custom debug information
    HasCustomDebugInformation,
}

const HAS_CUSTOM_ATTRIBUTE: [Option<TableId>; 22] = [
    Some(TableId::MethodDef),
    Some(TableId::Field),
    Some(TableId::TypeRef),
    Some(TableId::TypeDef),
    Some(TableId::Param),
    Some(TableId::InterfaceImpl),
    Some(TableId::MemberRef),
    Some(TableId::Module),
    Some(TableId::DeclSecurity),
    Some(TableId::Property),
    Some(TableId::Event),
    Some(TableId::StandAloneSig),
    Some(TableId::ModuleRef),
    Some(TableId::TypeSpec),
    Some(TableId::Assembly),
    Some(TableId::AssemblyRef),
    Some(TableId::File),
    Some(TableId::ExportedType),
    Some(TableId::ManifestResource),
    Some(TableId::GenericParam),
    Some(TableId::GenericParamConstraint),
    Some(TableId::MethodSpec),
];

const HAS_CUSTOM_DEBUG_INFORMATION: [Option<TableId>; 27] = [
    Some(TableId::MethodDef),
    Some(TableId::Field),
    Some(TableId::TypeRef),
    Some(TableId::TypeDef),
    Some(TableId::Param),
    Some(TableId::InterfaceImpl),
    Some(TableId::MemberRef),
    Some(TableId::Module),
    Some(TableId::DeclSecurity),
    Some(TableId::Property),
    Some(TableId::Event),
    Some(TableId::StandAloneSig),
    Some(TableId::ModuleRef),
    Some(TableId::TypeSpec),
    Some(TableId::Assembly),
    Some(TableId::AssemblyRef),
    Some(TableId::File),
    Some(TableId::ExportedType),
    Some(TableId::ManifestResource),
    Some(TableId::GenericParam),
    Some(TableId::GenericParamConstraint),
    Some(TableId::MethodSpec),
    Some(TableId::Document),
    Some(TableId::LocalScope),
    Some(TableId::LocalVariable),
    Some(TableId::LocalConstant),
    Some(TableId::ImportScope),
];

impl CodedIndexType {
    /// Target tables by tag value. `None` marks tag values that are reserved.
    #[must_use]
    pub fn tables(&self) -> &'static [Option<TableId>] {
        match self {
            CodedIndexType::TypeDefOrRef => &[
                Some(TableId::TypeDef),
                Some(TableId::TypeRef),
                Some(TableId::TypeSpec),
            ],
            CodedIndexType::HasConstant => &[
                Some(TableId::Field),
                Some(TableId::Param),
                Some(TableId::Property),
            ],
            CodedIndexType::HasCustomAttribute => &HAS_CUSTOM_ATTRIBUTE,
            CodedIndexType::HasFieldMarshal => &[Some(TableId::Field), Some(TableId::Param)],
            CodedIndexType::HasDeclSecurity => &[
                Some(TableId::TypeDef),
                Some(TableId::MethodDef),
                Some(TableId::Assembly),
            ],
            CodedIndexType::MemberRefParent => &[
                Some(TableId::TypeDef),
                Some(TableId::TypeRef),
                Some(TableId::ModuleRef),
                Some(TableId::MethodDef),
                Some(TableId::TypeSpec),
            ],
            CodedIndexType::HasSemantics => &[Some(TableId::Event), Some(TableId::Property)],
            CodedIndexType::MethodDefOrRef => &[Some(TableId::MethodDef), Some(TableId::MemberRef)],
            CodedIndexType::MemberForwarded => &[Some(TableId::Field), Some(TableId::MethodDef)],
            CodedIndexType::Implementation => &[
                Some(TableId::File),
                Some(TableId::AssemblyRef),
                Some(TableId::ExportedType),
            ],
            CodedIndexType::CustomAttributeType => &[
                None,
                None,
                Some(TableId::MethodDef),
                Some(TableId::MemberRef),
                None,
            ],
            CodedIndexType::ResolutionScope => &[
                Some(TableId::Module),
                Some(TableId::ModuleRef),
                Some(TableId::AssemblyRef),
                Some(TableId::TypeRef),
            ],
            CodedIndexType::TypeOrMethodDef => &[Some(TableId::TypeDef), Some(TableId::MethodDef)],
            CodedIndexType::HasCustomDebugInformation => &HAS_CUSTOM_DEBUG_INFORMATION,
        }
    }

    /// Number of low bits holding the tag
    #[must_use]
    pub fn tag_bits(&self) -> u8 {
        let count = self.tables().len();
        (usize::BITS - (count - 1).leading_zeros()) as u8
    }
}

/// A decoded coded index
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CodedIndex {
    /// Target table
    pub tag: TableId,
    /// 1-based row in the target table, 0 for a nil reference
    pub row: u32,
}

impl CodedIndex {
    /// Create a coded index
    #[must_use]
    pub fn new(tag: TableId, row: u32) -> Self {
        CodedIndex { tag, row }
    }

    /// Decode a raw coded index value.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for a reserved or out of range tag.
    pub fn decode(value: u32, coded_index_type: CodedIndexType) -> Result<Self> {
        let tag_bits = coded_index_type.tag_bits();
        let tag = (value & ((1 << tag_bits) - 1)) as usize;

        match coded_index_type.tables().get(tag) {
            Some(Some(table)) => Ok(CodedIndex::new(*table, value >> tag_bits)),
            _ => Err(malformed_error!(
                "Invalid tag {} for coded index {:?}",
                tag,
                coded_index_type
            )),
        }
    }

    /// Read and decode a coded index at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] or [`crate::Error::Malformed`].
    pub fn read(
        data: &[u8],
        offset: &mut usize,
        info: &TableInfo,
        coded_index_type: CodedIndexType,
    ) -> Result<Self> {
        let value = read_le_at_dyn(data, offset, info.coded_index_bytes(coded_index_type) == 4)?;
        Self::decode(value, coded_index_type)
    }

    /// Returns `true` for a nil reference
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.row == 0
    }

    /// The token of the referenced row
    #[must_use]
    pub fn token(&self) -> Token {
        Token::from_parts(self.tag as u8, self.row)
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn tag_bits() {
        assert_eq!(CodedIndexType::TypeDefOrRef.tag_bits(), 2);
        assert_eq!(CodedIndexType::HasFieldMarshal.tag_bits(), 1);
        assert_eq!(CodedIndexType::HasCustomAttribute.tag_bits(), 5);
        assert_eq!(CodedIndexType::CustomAttributeType.tag_bits(), 3);
        assert_eq!(CodedIndexType::HasCustomDebugInformation.tag_bits(), 5);
        assert_eq!(CodedIndexType::iter().count(), CodedIndexType::COUNT);
    }

    #[test]
    fn decode() {
        let index = CodedIndex::decode((7 << 2) | 1, CodedIndexType::TypeDefOrRef).unwrap();
        assert_eq!(index, CodedIndex::new(TableId::TypeRef, 7));
        assert_eq!(index.token(), Token::new(0x0100_0007));

        let index = CodedIndex::decode((1 << 5) | 14, CodedIndexType::HasCustomAttribute).unwrap();
        assert_eq!(index.tag, TableId::Assembly);

        let index = CodedIndex::decode((3 << 5) | 22, CodedIndexType::HasCustomDebugInformation)
            .unwrap();
        assert_eq!(index.tag, TableId::Document);
    }

    #[test]
    fn reserved_tags() {
        let index = CodedIndex::decode((1 << 3) | 3, CodedIndexType::CustomAttributeType).unwrap();
        assert_eq!(index.tag, TableId::MemberRef);

        if CodedIndex::decode(1 << 3, CodedIndexType::CustomAttributeType).is_ok() {
            panic!("This should not work!")
        }
        assert!(CodedIndex::decode(3, CodedIndexType::TypeDefOrRef).is_err());
    }
}
