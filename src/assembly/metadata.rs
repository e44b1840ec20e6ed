//! Assembly identity, references and assembly-level attributes.
//!
//! [`AssemblyMetadataParser`] reads the `Assembly`, `AssemblyRef` and `CustomAttribute` tables
//! directly. Attribute constructors are resolved through `MethodDef` or `MemberRef` to their
//! signatures; enum arguments are resolved through `TypeDef`, `TypeRef` and `Field`.

use std::collections::BTreeMap;

use crate::{
    assembly::identity::{AssemblyFlags, AssemblyIdentity, AssemblyVersion, StrongName},
    metadata::{
        customattributes::{parse_custom_attribute, CustomAttributeValue, TypeResolver},
        signatures::{SignatureParser, TypeSignature},
        tables::{
            AssemblyRaw, AssemblyRefRaw, CustomAttributeRaw, FieldRaw, MemberRefRaw, MethodDefRaw,
            TableId, TypeDefRaw, TypeRefRaw,
        },
        token::Token,
        view::MetadataView,
    },
    Error, File, Result,
};

/// An attribute applied to the assembly
#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyAttribute {
    /// Full name of the attribute type
    pub type_name: String,
    /// Decoded arguments
    pub value: CustomAttributeValue,
}

impl AssemblyAttribute {
    /// Type name without namespace and `Attribute` suffix
    #[must_use]
    pub fn short_name(&self) -> &str {
        let name = self
            .type_name
            .rsplit('.')
            .next()
            .unwrap_or(self.type_name.as_str());
        name.strip_suffix("Attribute").unwrap_or(name)
    }
}

/// Reads identity and attributes of a managed assembly
pub struct AssemblyMetadataParser {
    file: File,
}

impl AssemblyMetadataParser {
    /// Parse the PE image in `data`.
    ///
    /// # Errors
    /// Returns an error if `data` is not a PE image, or [`crate::Error::NotSupported`] if it is
    /// not a managed assembly.
    pub fn new(data: Vec<u8>) -> Result<Self> {
        let file = File::from_mem(data)?;
        if !file.is_managed() {
            return Err(Error::NotSupported);
        }

        Ok(AssemblyMetadataParser { file })
    }

    /// The PE image
    #[must_use]
    pub fn file(&self) -> &File {
        &self.file
    }

    fn view(&self) -> Result<MetadataView<'_>> {
        MetadataView::read(self.file.metadata()?)
    }

    /// Identity of the assembly, `None` for a module without an `Assembly` row.
    ///
    /// # Errors
    /// Returns an error if the metadata is damaged.
    pub fn assembly_identity(&self) -> Result<Option<AssemblyIdentity>> {
        let view = self.view()?;
        let Some(assembly) = view.table::<AssemblyRaw>().and_then(|table| table.get(1)) else {
            return Ok(None);
        };

        Ok(Some(AssemblyIdentity {
            name: view.string(assembly.name)?.to_string(),
            version: AssemblyVersion::new(
                assembly.major_version,
                assembly.minor_version,
                assembly.build_number,
                assembly.revision_number,
            ),
            culture: culture(view.string(assembly.culture)?),
            strong_name: StrongName::from_blob(view.blob(assembly.public_key)?, true)?,
        }))
    }

    /// Identities of all referenced assemblies, in table order.
    ///
    /// # Errors
    /// Returns an error if the metadata is damaged.
    pub fn referenced_assemblies(&self) -> Result<Vec<AssemblyIdentity>> {
        let view = self.view()?;
        let Some(table) = view.table::<AssemblyRefRaw>() else {
            return Ok(Vec::new());
        };

        table
            .rows()?
            .into_iter()
            .map(|reference| {
                Ok(AssemblyIdentity {
                    name: view.string(reference.name)?.to_string(),
                    version: AssemblyVersion::new(
                        reference.major_version,
                        reference.minor_version,
                        reference.build_number,
                        reference.revision_number,
                    ),
                    culture: culture(view.string(reference.culture)?),
                    strong_name: StrongName::from_blob(
                        view.blob(reference.public_key_or_token)?,
                        AssemblyFlags::from_bits_truncate(reference.flags)
                            .contains(AssemblyFlags::PUBLIC_KEY),
                    )?,
                })
            })
            .collect()
    }

    /// Attributes applied to the assembly.
    ///
    /// Attributes whose argument types cannot be resolved are skipped and logged.
    ///
    /// # Errors
    /// Returns an error if the metadata or an attribute blob is damaged.
    pub fn assembly_attributes(&self) -> Result<Vec<AssemblyAttribute>> {
        let view = self.view()?;
        let Some(table) = view.table::<CustomAttributeRaw>() else {
            return Ok(Vec::new());
        };

        let mut attributes = Vec::new();
        for row in table.rows()? {
            if row.parent.tag != TableId::Assembly || row.parent.row != 1 {
                continue;
            }

            let (type_name, params) = constructor(&view, row.constructor.token())?;
            match parse_custom_attribute(view.blob(row.value)?, &params, &view) {
                Ok(value) => attributes.push(AssemblyAttribute { type_name, value }),
                Err(Error::UnresolvedType(unresolved)) => {
                    log::warn!(
                        "Skipping attribute {} with unresolved argument type {}",
                        type_name,
                        unresolved
                    );
                }
                Err(error) => return Err(error),
            }
        }

        Ok(attributes)
    }

    /// Assembly attributes rendered as short name to value, e.g.
    /// `AssemblyInformationalVersion` to `1.0.0+abc`. Repeated attributes are joined with `; `.
    ///
    /// # Errors
    /// Returns an error if the metadata or an attribute blob is damaged.
    pub fn metadata(&self) -> Result<BTreeMap<String, String>> {
        let mut metadata: BTreeMap<String, String> = BTreeMap::new();
        for attribute in self.assembly_attributes()? {
            let value = attribute.value.to_string();
            metadata
                .entry(attribute.short_name().to_string())
                .and_modify(|existing| {
                    existing.push_str("; ");
                    existing.push_str(&value);
                })
                .or_insert(value);
        }

        Ok(metadata)
    }
}

fn culture(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Owning type name and parameter types of an attribute constructor
fn constructor(view: &MetadataView<'_>, token: Token) -> Result<(String, Vec<TypeSignature>)> {
    let (owner, signature) = match token.table() {
        table if table == TableId::MethodDef as u8 => {
            let Some(method) = view
                .table::<MethodDefRaw>()
                .and_then(|methods| methods.get(token.row()))
            else {
                return Err(malformed_error!("Invalid attribute constructor {:?}", token));
            };
            (owning_type(view, method.rid)?, method.signature)
        }
        table if table == TableId::MemberRef as u8 => {
            let Some(member) = view
                .table::<MemberRefRaw>()
                .and_then(|members| members.get(token.row()))
            else {
                return Err(malformed_error!("Invalid attribute constructor {:?}", token));
            };
            (member.class.token(), member.signature)
        }
        _ => return Err(malformed_error!("Invalid attribute constructor {:?}", token)),
    };

    let signature = SignatureParser::new(view.blob(signature)?).parse_method_signature()?;
    Ok((view.type_name(owner)?, signature.params))
}

/// The TypeDef whose method list contains `method`
fn owning_type(view: &MetadataView<'_>, method: u32) -> Result<Token> {
    let Some(types) = view.table::<TypeDefRaw>() else {
        return Err(malformed_error!("MethodDef {} without TypeDef table", method));
    };

    let types = types.rows()?;
    let owner = types
        .iter()
        .rev()
        .find(|definition| definition.method_list <= method)
        .ok_or_else(|| malformed_error!("MethodDef {} has no owning type", method))?;

    Ok(Token::from_parts(TableId::TypeDef as u8, owner.rid))
}

fn qualified(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{namespace}.{name}")
    }
}

impl MetadataView<'_> {
    fn type_definition(&self, rid: u32) -> Result<TypeDefRaw> {
        self.table::<TypeDefRaw>()
            .and_then(|table| table.get(rid))
            .ok_or_else(|| malformed_error!("Invalid TypeDef row {}", rid))
    }

    /// Underlying type of a local enum: the type of its first instance field, `value__`
    fn local_enum_underlying_type(&self, rid: u32) -> Result<Option<TypeSignature>> {
        let definition = self.type_definition(rid)?;
        if definition.extends.is_null() || self.type_name(definition.extends.token())? != "System.Enum"
        {
            return Ok(None);
        }

        let Some(fields) = self.table::<FieldRaw>() else {
            return Ok(None);
        };
        let end = self
            .table::<TypeDefRaw>()
            .and_then(|table| table.get(rid + 1))
            .map_or(fields.row_count() + 1, |next| next.field_list);

        for field_rid in definition.field_list..end {
            let Some(field) = fields.get(field_rid) else {
                break;
            };
            if field.flags & FieldRaw::STATIC != 0 {
                continue;
            }

            let signature =
                SignatureParser::new(self.blob(field.signature)?).parse_field_signature()?;
            return Ok(Some(signature));
        }

        Ok(None)
    }

    /// The TypeDef with the given full name
    fn find_type_definition(&self, full_name: &str) -> Result<Option<u32>> {
        let Some(table) = self.table::<TypeDefRaw>() else {
            return Ok(None);
        };

        for definition in table.rows()? {
            let name = qualified(
                self.string(definition.type_namespace)?,
                self.string(definition.type_name)?,
            );
            if name == full_name {
                return Ok(Some(definition.rid));
            }
        }

        Ok(None)
    }
}

impl TypeResolver for MetadataView<'_> {
    fn type_name(&self, token: Token) -> Result<String> {
        match token.table() {
            table if table == TableId::TypeDef as u8 => {
                let definition = self.type_definition(token.row())?;
                Ok(qualified(
                    self.string(definition.type_namespace)?,
                    self.string(definition.type_name)?,
                ))
            }
            table if table == TableId::TypeRef as u8 => {
                let Some(reference) = self
                    .table::<TypeRefRaw>()
                    .and_then(|table| table.get(token.row()))
                else {
                    return Err(malformed_error!("Invalid TypeRef {:?}", token));
                };

                let name = self.string(reference.type_name)?;
                if reference.resolution_scope.tag == TableId::TypeRef
                    && !reference.resolution_scope.is_null()
                    && reference.resolution_scope.row != token.row()
                {
                    let outer = self.type_name(reference.resolution_scope.token())?;
                    return Ok(format!("{outer}+{name}"));
                }

                Ok(qualified(self.string(reference.type_namespace)?, name))
            }
            _ => Err(Error::UnresolvedType(format!("{token:?}"))),
        }
    }

    fn enum_underlying_type(&self, token: Token) -> Result<Option<TypeSignature>> {
        match token.table() {
            table if table == TableId::TypeDef as u8 => self.local_enum_underlying_type(token.row()),
            table if table == TableId::TypeRef as u8 => {
                // Only enums defined in this assembly can be resolved
                match self.find_type_definition(&self.type_name(token)?)? {
                    Some(rid) => self.local_enum_underlying_type(rid),
                    None => Ok(None),
                }
            }
            _ => Ok(None),
        }
    }

    fn enum_underlying_type_by_name(&self, name: &str) -> Result<Option<TypeSignature>> {
        let type_name = name.split(',').next().unwrap_or(name).trim();
        match self.find_type_definition(type_name)? {
            Some(rid) => self.local_enum_underlying_type(rid),
            None => Ok(None),
        }
    }
}
