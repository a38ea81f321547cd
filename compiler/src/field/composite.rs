use brine_proto_schema::{FieldDescriptor, ImportSet, Rule, ValidationErrors, ViolationKind, WireKind};
use tracing::warn;

use crate::registry::BuildContext;

use super::{
    impl_field_builder,
    rules::{LengthRules, ITEM_COUNT, PAIR_COUNT},
    FieldCore, FieldModel, Resolved,
};

/// A `repeated` field wrapping exactly one item field.
#[derive(Debug, Clone, PartialEq)]
pub struct RepeatedField {
    pub(crate) core:   FieldCore,
    pub(crate) item:   Box<FieldModel>,
    pub(crate) count:  LengthRules,
    pub(crate) unique: bool,
}

impl RepeatedField {
    pub(crate) fn new(name: &str, item: FieldModel) -> Self {
        RepeatedField {
            core:   FieldCore::new(name),
            item:   Box::new(item),
            count:  LengthRules::default(),
            unique: false,
        }
    }

    pub fn item(&self) -> &FieldModel {
        &self.item
    }

    pub fn min_items(mut self, value: u64) -> Self {
        self.count.min = Some(value);
        self
    }

    pub fn max_items(mut self, value: u64) -> Self {
        self.count.max = Some(value);
        self
    }

    /// Every item must be distinct. Only scalar items support this.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub(crate) fn build(self, number: u32, ctx: &mut BuildContext) -> Result<FieldDescriptor, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let mut item = *self.item;

        if item.is_collection() {
            errors.push(ViolationKind::NestedCollection {
                outer: "repeated".to_string(),
                inner: item.kind_name(),
            });
        }
        if self.unique && item.scalar_kind().is_none() {
            errors.push(ViolationKind::UniqueOnNonScalar { kind: item.kind_name() });
        }
        if item.is_optional() {
            warn!(field = %self.core.name, "dropping optional from repeated item");
            item.clear_optional();
        }
        self.count.check(ITEM_COUNT, &mut errors);

        // A nested collection is already reported; building it would only
        // repeat the same complaints one level down.
        if !errors.is_empty() {
            return Err(errors);
        }
        let item = errors.collect("items", item.build(number, ctx));
        let item = match item {
            Some(item) => item,
            None => return Err(errors),
        };

        let mut rules = self.count.rules("repeated", ITEM_COUNT);
        if self.unique {
            rules.push(Rule::new(["repeated", "unique"], true));
        }
        rules.extend(item.rules.iter().cloned().map(|rule| rule.wrapped(&["repeated", "items"])));

        let resolved = Resolved {
            proto_type:  item.proto_type.clone(),
            target_type: format!("Vec<{}>", item.target_type),
            group:       Some("repeated"),
            imports:     item.imports.iter().cloned().collect::<ImportSet>(),
            kind:        WireKind::Repeated { item: Box::new(item) },
            rules,
        };
        self.core.finish(number, resolved, errors, ctx)
    }
}

/// A `map<K, V>` field.
#[derive(Debug, Clone, PartialEq)]
pub struct MapField {
    pub(crate) core:  FieldCore,
    pub(crate) key:   Box<FieldModel>,
    pub(crate) value: Box<FieldModel>,
    pub(crate) pairs: LengthRules,
}

impl MapField {
    pub(crate) fn new(name: &str, key: FieldModel, value: FieldModel) -> Self {
        MapField {
            core:  FieldCore::new(name),
            key:   Box::new(key),
            value: Box::new(value),
            pairs: LengthRules::default(),
        }
    }

    pub fn key(&self) -> &FieldModel {
        &self.key
    }

    pub fn value(&self) -> &FieldModel {
        &self.value
    }

    pub fn min_pairs(mut self, value: u64) -> Self {
        self.pairs.min = Some(value);
        self
    }

    pub fn max_pairs(mut self, value: u64) -> Self {
        self.pairs.max = Some(value);
        self
    }

    pub(crate) fn build(self, number: u32, ctx: &mut BuildContext) -> Result<FieldDescriptor, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let mut key = *self.key;
        let mut value = *self.value;

        if !key.scalar_kind().map_or(false, |kind| kind.is_map_key()) {
            errors.push(ViolationKind::InvalidMapKey { kind: key.kind_name() });
        }
        if value.is_collection() {
            errors.push(ViolationKind::NestedCollection {
                outer: "map".to_string(),
                inner: value.kind_name(),
            });
        }
        for part in [&mut key, &mut value] {
            if part.is_optional() {
                warn!(field = %self.core.name, part = %part.name(), "dropping optional from map entry");
                part.clear_optional();
            }
        }
        self.pairs.check(PAIR_COUNT, &mut errors);
        if !errors.is_empty() {
            return Err(errors);
        }

        let key = errors.collect("key", key.build(1, ctx));
        let value = errors.collect("value", value.build(2, ctx));
        let (key, value) = match (key, value) {
            (Some(key), Some(value)) => (key, value),
            _ => return Err(errors),
        };

        let mut rules = self.pairs.rules("map", PAIR_COUNT);
        rules.extend(key.rules.iter().cloned().map(|rule| rule.wrapped(&["map", "keys"])));
        rules.extend(value.rules.iter().cloned().map(|rule| rule.wrapped(&["map", "values"])));

        let mut imports: ImportSet = key.imports.iter().cloned().collect();
        imports.extend(value.imports.iter().cloned());

        let resolved = Resolved {
            proto_type:  format!("map<{}, {}>", key.proto_type, value.proto_type),
            target_type: format!("HashMap<{}, {}>", key.target_type, value.target_type),
            group:       Some("map"),
            kind:        WireKind::Map {
                key:   Box::new(key),
                value: Box::new(value),
            },
            rules,
            imports,
        };
        self.core.finish(number, resolved, errors, ctx)
    }
}

impl_field_builder!(RepeatedField, MapField);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{self, Lengthed, Optional, Ranged};
    use pretty_assertions::assert_eq;

    fn build(field: impl Into<FieldModel>) -> Result<FieldDescriptor, ValidationErrors> {
        field.into().build(4, &mut BuildContext::new("test.proto"))
    }

    #[test]
    fn test_repeated_scalar_builds() {
        let desc = build(field::repeated("tags", field::string("tag").min_len(1)).max_items(10).unique()).unwrap();
        assert!(desc.repeated);
        assert_eq!(desc.proto_type, "string");
        assert_eq!(desc.target_type, "Vec<String>");
        let dotted: Vec<_> = desc.rules.iter().map(|r| r.dotted()).collect();
        assert_eq!(dotted, vec!["repeated.max_items", "repeated.unique", "repeated.items.string.min_len"]);
    }

    #[test]
    fn test_direct_nesting_fails() {
        let nested = [
            FieldModel::from(field::repeated("a", field::repeated("b", field::int32("c")))),
            FieldModel::from(field::repeated("a", field::map("b", field::string("k"), field::int32("v")))),
            FieldModel::from(field::map("a", field::string("k"), field::repeated("v", field::int32("c")))),
            FieldModel::from(field::map("a", field::string("k"), field::map("v", field::string("k"), field::int32("v")))),
        ];
        for model in nested {
            let err = build(model).unwrap_err();
            assert!(err.contains(|k| matches!(k, ViolationKind::NestedCollection { .. })));
        }
    }

    #[test]
    fn test_unique_requires_scalar_items() {
        let err = build(field::repeated("stamps", field::timestamp("at")).unique()).unwrap_err();
        assert_eq!(
            err.kinds().next(),
            Some(&ViolationKind::UniqueOnNonScalar { kind: "google.protobuf.Timestamp".into() })
        );
    }

    #[test]
    fn test_item_optional_is_dropped() {
        let desc = build(field::repeated("nicks", field::string("nick").optional())).unwrap();
        assert_eq!(desc.target_type, "Vec<String>");
        match desc.kind {
            WireKind::Repeated { item } => assert!(!item.optional),
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn test_item_count_bounds() {
        let err = build(field::repeated("ids", field::int64("id")).min_items(5).max_items(2)).unwrap_err();
        assert!(err.contains(|k| matches!(k, ViolationKind::MinExceedsMax { .. })));
    }

    #[test]
    fn test_item_errors_are_scoped() {
        let err = build(field::repeated("ids", field::int64("id").gt(5).lt(1))).unwrap_err();
        let violation = err.iter().next().unwrap();
        assert_eq!(violation.path, vec!["items".to_string()]);
    }

    #[test]
    fn test_map_rules_and_types() {
        let desc = build(
            field::map("scores", field::string("k").min_len(1), field::uint32("v").lte(100)).max_pairs(50),
        )
        .unwrap();
        assert!(desc.map);
        assert_eq!(desc.proto_type, "map<string, uint32>");
        assert_eq!(desc.target_type, "HashMap<String, u32>");
        let dotted: Vec<_> = desc.rules.iter().map(|r| r.dotted()).collect();
        assert_eq!(
            dotted,
            vec!["map.max_pairs", "map.keys.string.min_len", "map.values.uint32.lte"]
        );
    }

    #[test]
    fn test_map_key_kinds() {
        assert!(build(field::map("m", field::bool("k"), field::string("v"))).is_ok());
        assert!(build(field::map("m", field::sfixed64("k"), field::string("v"))).is_ok());
        for key in [
            FieldModel::from(field::double("k")),
            FieldModel::from(field::bytes("k")),
            FieldModel::from(field::timestamp("k")),
        ] {
            let err = build(field::map("m", key, field::string("v"))).unwrap_err();
            assert!(err.contains(|k| matches!(k, ViolationKind::InvalidMapKey { .. })));
        }
    }

    #[test]
    fn test_map_value_imports_flow_to_context() {
        let mut ctx = BuildContext::new("test.proto");
        let desc = field::map("deadlines", field::string("k"), field::timestamp("v"))
            .build(1, &mut ctx)
            .unwrap();
        assert_eq!(desc.imports, vec!["google/protobuf/timestamp.proto"]);
        assert_eq!(ctx.imports().to_vec(), vec!["google/protobuf/timestamp.proto"]);
    }
}
