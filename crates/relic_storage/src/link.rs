//! Relation decomposition: turning nested relation data into linked
//! insertions.

use std::sync::Arc;

use relic_foundation::{Error, Record, RecordRef, Result, Value};
use relic_schema::{Registry, RelationKind};

/// One record destined for a resource's store, produced by decomposition.
#[derive(Debug)]
pub(crate) struct Insertion {
    pub resource: Arc<str>,
    pub record: Record,
}

/// Decomposes a raw record into insertions, children before parents.
///
/// For each declared relation whose related resource is registered and
/// whose local field holds nested data, the nested record(s) are split
/// out as their own insertions and the field is replaced with
/// [`Value::Ref`] links. Unregistered related resources and fields
/// without nested data are left untouched: inert, not an error.
///
/// Decomposition is pure: it runs before any store mutation, so a missing
/// child key aborts the whole inject with the stores unchanged.
pub(crate) fn decompose(
    registry: &Registry,
    resource: &str,
    raw: Record,
    out: &mut Vec<Insertion>,
) -> Result<()> {
    let def = registry.expect(resource)?;
    let name = def.name_arc();
    let relations: Vec<_> = def.relations().to_vec();
    let mut record = raw;

    // Declaration order; only affects hook/diagnostic ordering since
    // relations are independent.
    for relation in &relations {
        if !registry.is_registered(&relation.related) {
            continue;
        }
        let Some(value) = record.get(&relation.local_field).cloned() else {
            continue;
        };

        match relation.kind {
            RelationKind::HasOne | RelationKind::BelongsTo => {
                if let Some(child) = Record::from_value(&value) {
                    let link = decompose_child(registry, &relation.related, child, out)?;
                    record.set(relation.local_field.clone(), Value::Ref(link));
                }
            }
            RelationKind::HasMany => {
                if let Some(items) = value.as_list() {
                    let mut linked = im::Vector::new();
                    for item in items {
                        match Record::from_value(item) {
                            Some(child) => {
                                let link =
                                    decompose_child(registry, &relation.related, child, out)?;
                                linked.push_back(Value::Ref(link));
                            }
                            // Non-record elements pass through unchanged.
                            None => linked.push_back(item.clone()),
                        }
                    }
                    record.set(relation.local_field.clone(), Value::List(linked));
                }
            }
        }
    }

    out.push(Insertion {
        resource: name,
        record,
    });
    Ok(())
}

fn decompose_child(
    registry: &Registry,
    related: &str,
    child: Record,
    out: &mut Vec<Insertion>,
) -> Result<RecordRef> {
    let child_def = registry.expect(related)?;
    let key = child
        .key(child_def.id_attribute())
        .ok_or_else(|| Error::missing_key(related, child_def.id_attribute()))?;
    decompose(registry, related, child, out)?;
    Ok(RecordRef::new(child_def.name_arc(), key))
}
