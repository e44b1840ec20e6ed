//! Typed rows of the decoded tables.
//!
//! Heap columns hold raw heap indexes; resolve them through the heaps of the owning
//! [`crate::metadata::MetadataView`].

use crate::{
    file::io::{read_le_at, read_le_at_dyn},
    metadata::tables::{CodedIndex, CodedIndexType, RowReadable, TableId, TableInfo},
    Result,
};

/// `Module` (0x00)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModuleRaw {
    /// Row id
    pub rid: u32,
    /// Reserved, 0
    pub generation: u16,
    /// `#Strings` index of the module name
    pub name: u32,
    /// `#GUID` index of the module version id
    pub mvid: u32,
}

impl RowReadable for ModuleRaw {
    const TABLE_ID: TableId = TableId::Module;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        let row = ModuleRaw {
            rid,
            generation: read_le_at::<u16>(data, offset)?,
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            mvid: read_le_at_dyn(data, offset, sizes.is_large_guid())?,
        };

        // EncId, EncBaseId
        read_le_at_dyn(data, offset, sizes.is_large_guid())?;
        read_le_at_dyn(data, offset, sizes.is_large_guid())?;

        Ok(row)
    }
}

/// `TypeRef` (0x01)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeRefRaw {
    /// Row id
    pub rid: u32,
    /// Module, ModuleRef, AssemblyRef or enclosing TypeRef
    pub resolution_scope: CodedIndex,
    /// `#Strings` index of the type name
    pub type_name: u32,
    /// `#Strings` index of the namespace
    pub type_namespace: u32,
}

impl RowReadable for TypeRefRaw {
    const TABLE_ID: TableId = TableId::TypeRef;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(TypeRefRaw {
            rid,
            resolution_scope: CodedIndex::read(data, offset, sizes, CodedIndexType::ResolutionScope)?,
            type_name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            type_namespace: read_le_at_dyn(data, offset, sizes.is_large_str())?,
        })
    }
}

/// `TypeDef` (0x02)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeDefRaw {
    /// Row id
    pub rid: u32,
    /// `TypeAttributes`
    pub flags: u32,
    /// `#Strings` index of the type name
    pub type_name: u32,
    /// `#Strings` index of the namespace
    pub type_namespace: u32,
    /// Base type
    pub extends: CodedIndex,
    /// First row of the type's run in the Field table
    pub field_list: u32,
    /// First row of the type's run in the MethodDef table
    pub method_list: u32,
}

impl RowReadable for TypeDefRaw {
    const TABLE_ID: TableId = TableId::TypeDef;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(TypeDefRaw {
            rid,
            flags: read_le_at::<u32>(data, offset)?,
            type_name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            type_namespace: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            extends: CodedIndex::read(data, offset, sizes, CodedIndexType::TypeDefOrRef)?,
            field_list: read_le_at_dyn(data, offset, sizes.is_large(TableId::Field))?,
            method_list: read_le_at_dyn(data, offset, sizes.is_large(TableId::MethodDef))?,
        })
    }
}

/// `Field` (0x04)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldRaw {
    /// Row id
    pub rid: u32,
    /// `FieldAttributes`
    pub flags: u16,
    /// `#Strings` index of the field name
    pub name: u32,
    /// `#Blob` index of the field signature
    pub signature: u32,
}

impl FieldRaw {
    /// `fdStatic`
    pub const STATIC: u16 = 0x0010;
}

impl RowReadable for FieldRaw {
    const TABLE_ID: TableId = TableId::Field;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(FieldRaw {
            rid,
            flags: read_le_at::<u16>(data, offset)?,
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            signature: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
        })
    }
}

/// `MethodDef` (0x06)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodDefRaw {
    /// Row id
    pub rid: u32,
    /// RVA of the method body
    pub rva: u32,
    /// `MethodImplAttributes`
    pub impl_flags: u16,
    /// `MethodAttributes`
    pub flags: u16,
    /// `#Strings` index of the method name
    pub name: u32,
    /// `#Blob` index of the method signature
    pub signature: u32,
    /// First row of the method's run in the Param table
    pub param_list: u32,
}

impl RowReadable for MethodDefRaw {
    const TABLE_ID: TableId = TableId::MethodDef;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(MethodDefRaw {
            rid,
            rva: read_le_at::<u32>(data, offset)?,
            impl_flags: read_le_at::<u16>(data, offset)?,
            flags: read_le_at::<u16>(data, offset)?,
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            signature: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
            param_list: read_le_at_dyn(data, offset, sizes.is_large(TableId::Param))?,
        })
    }
}

/// `MemberRef` (0x0A)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberRefRaw {
    /// Row id
    pub rid: u32,
    /// Owning type or module
    pub class: CodedIndex,
    /// `#Strings` index of the member name
    pub name: u32,
    /// `#Blob` index of the member signature
    pub signature: u32,
}

impl RowReadable for MemberRefRaw {
    const TABLE_ID: TableId = TableId::MemberRef;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(MemberRefRaw {
            rid,
            class: CodedIndex::read(data, offset, sizes, CodedIndexType::MemberRefParent)?,
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            signature: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
        })
    }
}

/// `CustomAttribute` (0x0C)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CustomAttributeRaw {
    /// Row id
    pub rid: u32,
    /// The attributed entity
    pub parent: CodedIndex,
    /// The attribute constructor, a MethodDef or MemberRef
    pub constructor: CodedIndex,
    /// `#Blob` index of the argument blob
    pub value: u32,
}

impl RowReadable for CustomAttributeRaw {
    const TABLE_ID: TableId = TableId::CustomAttribute;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(CustomAttributeRaw {
            rid,
            parent: CodedIndex::read(data, offset, sizes, CodedIndexType::HasCustomAttribute)?,
            constructor: CodedIndex::read(data, offset, sizes, CodedIndexType::CustomAttributeType)?,
            value: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
        })
    }
}

/// `Assembly` (0x20)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssemblyRaw {
    /// Row id
    pub rid: u32,
    /// `AssemblyHashAlgorithm`
    pub hash_alg_id: u32,
    /// Major version
    pub major_version: u16,
    /// Minor version
    pub minor_version: u16,
    /// Build number
    pub build_number: u16,
    /// Revision number
    pub revision_number: u16,
    /// `AssemblyFlags`
    pub flags: u32,
    /// `#Blob` index of the public key
    pub public_key: u32,
    /// `#Strings` index of the simple name
    pub name: u32,
    /// `#Strings` index of the culture
    pub culture: u32,
}

impl RowReadable for AssemblyRaw {
    const TABLE_ID: TableId = TableId::Assembly;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(AssemblyRaw {
            rid,
            hash_alg_id: read_le_at::<u32>(data, offset)?,
            major_version: read_le_at::<u16>(data, offset)?,
            minor_version: read_le_at::<u16>(data, offset)?,
            build_number: read_le_at::<u16>(data, offset)?,
            revision_number: read_le_at::<u16>(data, offset)?,
            flags: read_le_at::<u32>(data, offset)?,
            public_key: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            culture: read_le_at_dyn(data, offset, sizes.is_large_str())?,
        })
    }
}

/// `AssemblyRef` (0x23)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssemblyRefRaw {
    /// Row id
    pub rid: u32,
    /// Major version
    pub major_version: u16,
    /// Minor version
    pub minor_version: u16,
    /// Build number
    pub build_number: u16,
    /// Revision number
    pub revision_number: u16,
    /// `AssemblyFlags`; bit 0 marks a full public key instead of a token
    pub flags: u32,
    /// `#Blob` index of the public key or token
    pub public_key_or_token: u32,
    /// `#Strings` index of the simple name
    pub name: u32,
    /// `#Strings` index of the culture
    pub culture: u32,
    /// `#Blob` index of the hash value
    pub hash_value: u32,
}

impl RowReadable for AssemblyRefRaw {
    const TABLE_ID: TableId = TableId::AssemblyRef;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(AssemblyRefRaw {
            rid,
            major_version: read_le_at::<u16>(data, offset)?,
            minor_version: read_le_at::<u16>(data, offset)?,
            build_number: read_le_at::<u16>(data, offset)?,
            revision_number: read_le_at::<u16>(data, offset)?,
            flags: read_le_at::<u32>(data, offset)?,
            public_key_or_token: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            culture: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            hash_value: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
        })
    }
}

/// `Document` (0x30)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentRaw {
    /// Row id
    pub rid: u32,
    /// `#Blob` index of the document name blob
    pub name: u32,
    /// `#GUID` index of the hash algorithm
    pub hash_algorithm: u32,
    /// `#Blob` index of the content hash
    pub hash: u32,
    /// `#GUID` index of the language
    pub language: u32,
}

impl RowReadable for DocumentRaw {
    const TABLE_ID: TableId = TableId::Document;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(DocumentRaw {
            rid,
            name: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
            hash_algorithm: read_le_at_dyn(data, offset, sizes.is_large_guid())?,
            hash: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
            language: read_le_at_dyn(data, offset, sizes.is_large_guid())?,
        })
    }
}

/// `MethodDebugInformation` (0x31)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodDebugInformationRaw {
    /// Row id, equal to the MethodDef row it describes
    pub rid: u32,
    /// Single document of the method, 0 if the sequence points name several
    pub document: u32,
    /// `#Blob` index of the sequence points
    pub sequence_points: u32,
}

impl RowReadable for MethodDebugInformationRaw {
    const TABLE_ID: TableId = TableId::MethodDebugInformation;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(MethodDebugInformationRaw {
            rid,
            document: read_le_at_dyn(data, offset, sizes.is_large(TableId::Document))?,
            sequence_points: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
        })
    }
}

/// `CustomDebugInformation` (0x37)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CustomDebugInformationRaw {
    /// Row id
    pub rid: u32,
    /// The entity the information is attached to
    pub parent: CodedIndex,
    /// `#GUID` index of the information kind
    pub kind: u32,
    /// `#Blob` index of the value
    pub value: u32,
}

impl RowReadable for CustomDebugInformationRaw {
    const TABLE_ID: TableId = TableId::CustomDebugInformation;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(CustomDebugInformationRaw {
            rid,
            parent: CodedIndex::read(
                data,
                offset,
                sizes,
                CodedIndexType::HasCustomDebugInformation,
            )?,
            kind: read_le_at_dyn(data, offset, sizes.is_large_guid())?,
            value: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
        })
    }
}
