/*!
Bidirectional binding between value kinds, handlers and wire identifiers.
*/

use std::collections::HashMap;
use std::io::{Read, Seek, Write};

use tracing::debug;

use crate::error::BindingKey;
use crate::framing::MARKER_BASE;
use crate::handlers;
use crate::reader::Reader;
use crate::value::{Value, ValueKind};
use crate::writer::Writer;
use crate::{Result, SnapwireError};

/// Default wire id of the integer handler.
pub const INTEGER_ID: u8 = 1;
/// Default wire id of the mapping handler.
pub const MAPPING_ID: u8 = 2;
/// Default wire id of the text handler.
pub const TEXT_ID: u8 = 3;
/// Default wire id of the float handler.
pub const FLOAT_ID: u8 = 4;
/// Default wire id of the sequence handler.
pub const SEQUENCE_ID: u8 = 5;

/// A handler bound to one value kind under one wire identifier.
///
/// Encoding and decoding dispatch on the closed [`ValueKind`] set; the
/// binding only decides which byte announces that kind on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeBinding {
    kind: ValueKind,
    wire_id: u8,
    may_override: bool,
}

impl TypeBinding {
    pub fn new(kind: ValueKind, wire_id: u8) -> Self {
        Self {
            kind,
            wire_id,
            may_override: false,
        }
    }

    /// Let this binding replace an existing one for the same kind or id.
    pub fn overriding(mut self) -> Self {
        self.may_override = true;
        self
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn wire_id(&self) -> u8 {
        self.wire_id
    }

    pub fn may_override(&self) -> bool {
        self.may_override
    }

    pub fn is_container(&self) -> bool {
        self.kind.is_container()
    }

    /// Encode `value` with this binding's handler. Returns bytes written.
    pub fn encode<W: Write>(&self, writer: &mut Writer<'_, W>, value: &Value) -> Result<usize> {
        handlers::encode(self.kind, writer, value)
    }

    /// Decode one value with this binding's handler.
    pub fn decode<R: Read + Seek>(&self, reader: &mut Reader<'_, R>) -> Result<Value> {
        handlers::decode(self.kind, reader)
    }
}

/// Registry of type bindings.
///
/// Both directions are looked up in O(1). Every kind maps to exactly one
/// binding and every wire id maps to exactly one binding.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    by_kind: HashMap<ValueKind, TypeBinding>,
    by_id: HashMap<u8, TypeBinding>,
}

impl TypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the five built-in handlers.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for binding in default_bindings() {
            // The defaults are disjoint and below the marker range.
            registry.insert(binding);
        }
        registry
    }

    /// Bind `binding.kind() <-> binding.wire_id()`.
    ///
    /// # Errors
    /// * `ReservedWireId` - the id lies in the control-marker range
    /// * `DuplicateBinding` - kind or id already bound and the binding does
    ///   not request override
    pub fn register(&mut self, binding: TypeBinding) -> Result<()> {
        if binding.wire_id >= MARKER_BASE {
            return Err(SnapwireError::ReservedWireId(binding.wire_id));
        }

        if !binding.may_override {
            if self.by_kind.contains_key(&binding.kind) {
                return Err(SnapwireError::DuplicateBinding(BindingKey::Kind(binding.kind)));
            }
            if self.by_id.contains_key(&binding.wire_id) {
                return Err(SnapwireError::DuplicateBinding(BindingKey::WireId(
                    binding.wire_id,
                )));
            }
        }

        self.insert(binding);
        Ok(())
    }

    fn insert(&mut self, binding: TypeBinding) {
        // Drop reverse entries of whatever this binding displaces so the two
        // maps stay a bijection.
        if let Some(old) = self.by_kind.insert(binding.kind, binding) {
            if old.wire_id != binding.wire_id {
                self.by_id.remove(&old.wire_id);
            }
            debug!(kind = %binding.kind, old_id = old.wire_id, new_id = binding.wire_id, "Replaced type binding");
        }
        if let Some(old) = self.by_id.insert(binding.wire_id, binding) {
            if old.kind != binding.kind {
                self.by_kind.remove(&old.kind);
                debug!(wire_id = binding.wire_id, old_kind = %old.kind, new_kind = %binding.kind, "Rebound wire id");
            }
        }
        debug!(kind = %binding.kind, wire_id = binding.wire_id, "Registered type binding");
    }

    pub fn lookup_by_kind(&self, kind: ValueKind) -> Option<&TypeBinding> {
        self.by_kind.get(&kind)
    }

    pub fn lookup_by_id(&self, wire_id: u8) -> Option<&TypeBinding> {
        self.by_id.get(&wire_id)
    }

    /// True iff `wire_id` is bound to a mapping or sequence handler.
    pub fn is_container(&self, wire_id: u8) -> bool {
        self.by_id
            .get(&wire_id)
            .map(TypeBinding::is_container)
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Bindings ordered by wire id.
    pub fn bindings(&self) -> Vec<TypeBinding> {
        let mut bindings: Vec<_> = self.by_id.values().copied().collect();
        bindings.sort_by_key(|b| b.wire_id);
        bindings
    }
}

fn default_bindings() -> [TypeBinding; 5] {
    [
        TypeBinding::new(ValueKind::Integer, INTEGER_ID),
        TypeBinding::new(ValueKind::Mapping, MAPPING_ID),
        TypeBinding::new(ValueKind::Text, TEXT_ID),
        TypeBinding::new(ValueKind::Float, FLOAT_ID),
        TypeBinding::new(ValueKind::Sequence, SEQUENCE_ID),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry() {
        let registry = TypeRegistry::with_defaults();
        assert_eq!(registry.len(), 5);
        for kind in ValueKind::ALL {
            let binding = registry.lookup_by_kind(kind).unwrap();
            assert_eq!(registry.lookup_by_id(binding.wire_id()), Some(binding));
        }
        assert_eq!(registry.lookup_by_kind(ValueKind::Sequence).unwrap().wire_id(), SEQUENCE_ID);
    }

    #[test]
    fn test_is_container() {
        let registry = TypeRegistry::with_defaults();
        assert!(registry.is_container(MAPPING_ID));
        assert!(registry.is_container(SEQUENCE_ID));
        assert!(!registry.is_container(INTEGER_ID));
        assert!(!registry.is_container(TEXT_ID));
        assert!(!registry.is_container(FLOAT_ID));
        assert!(!registry.is_container(99));
    }

    #[test]
    fn test_lookup_absence_is_not_an_error() {
        let registry = TypeRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.lookup_by_kind(ValueKind::Integer).is_none());
        assert!(registry.lookup_by_id(1).is_none());
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut registry = TypeRegistry::new();
        registry.register(TypeBinding::new(ValueKind::Integer, 1)).unwrap();

        let err = registry
            .register(TypeBinding::new(ValueKind::Integer, 1))
            .unwrap_err();
        assert!(matches!(
            err,
            SnapwireError::DuplicateBinding(BindingKey::Kind(ValueKind::Integer))
        ));

        let err = registry
            .register(TypeBinding::new(ValueKind::Text, 1))
            .unwrap_err();
        assert!(matches!(err, SnapwireError::DuplicateBinding(BindingKey::WireId(1))));

        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_override_replaces_both_directions() {
        let mut registry = TypeRegistry::with_defaults();
        registry
            .register(TypeBinding::new(ValueKind::Integer, 42).overriding())
            .unwrap();

        assert_eq!(registry.lookup_by_kind(ValueKind::Integer).unwrap().wire_id(), 42);
        assert_eq!(registry.lookup_by_id(42).unwrap().kind(), ValueKind::Integer);
        assert!(registry.lookup_by_id(INTEGER_ID).is_none());
        assert_eq!(registry.len(), 5);
    }

    #[test]
    fn test_override_rebinds_taken_id() {
        let mut registry = TypeRegistry::with_defaults();
        registry
            .register(TypeBinding::new(ValueKind::Float, TEXT_ID).overriding())
            .unwrap();

        assert_eq!(registry.lookup_by_id(TEXT_ID).unwrap().kind(), ValueKind::Float);
        assert!(registry.lookup_by_kind(ValueKind::Text).is_none());
        assert!(registry.lookup_by_id(FLOAT_ID).is_none());
    }

    #[test]
    fn test_reserved_wire_ids_rejected() {
        let mut registry = TypeRegistry::new();
        for id in [192u8, 200, 255] {
            let err = registry
                .register(TypeBinding::new(ValueKind::Text, id).overriding())
                .unwrap_err();
            assert!(matches!(err, SnapwireError::ReservedWireId(x) if x == id));
        }
        registry.register(TypeBinding::new(ValueKind::Text, 191)).unwrap();
    }
}
