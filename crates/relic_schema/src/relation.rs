//! Relation declarations between resources.

/// The kind of a declared relation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RelationKind {
    /// This resource owns at most one related record; the related record
    /// carries a foreign key pointing back.
    HasOne,
    /// This resource owns any number of related records; each carries a
    /// foreign key pointing back.
    HasMany,
    /// This resource carries a local key naming its owner.
    BelongsTo,
}

/// A directional relation declaration.
///
/// Both ends must name registered resources at link time, otherwise the
/// relation is inert: nested foreign data stays in place as plain values
/// and no linking is attempted.
#[derive(Clone, Debug)]
pub struct RelationDef {
    /// Relation kind.
    pub kind: RelationKind,
    /// Name of the related resource.
    pub related: String,
    /// Field on this resource's records holding the nested data / link.
    pub local_field: String,
    /// For `HasOne`/`HasMany`: the field on related records that points
    /// back at this record's key.
    pub foreign_key: Option<String>,
    /// For `BelongsTo`: the field on this record holding the related key.
    pub local_key: Option<String>,
    /// Marks a `BelongsTo` relation as the endpoint-hierarchy parent.
    pub parent: bool,
}

impl RelationDef {
    /// Declares a hasOne relation.
    #[must_use]
    pub fn has_one(
        related: impl Into<String>,
        local_field: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self {
            kind: RelationKind::HasOne,
            related: related.into(),
            local_field: local_field.into(),
            foreign_key: Some(foreign_key.into()),
            local_key: None,
            parent: false,
        }
    }

    /// Declares a hasMany relation.
    #[must_use]
    pub fn has_many(
        related: impl Into<String>,
        local_field: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self {
            kind: RelationKind::HasMany,
            related: related.into(),
            local_field: local_field.into(),
            foreign_key: Some(foreign_key.into()),
            local_key: None,
            parent: false,
        }
    }

    /// Declares a belongsTo relation.
    #[must_use]
    pub fn belongs_to(
        related: impl Into<String>,
        local_field: impl Into<String>,
        local_key: impl Into<String>,
    ) -> Self {
        Self {
            kind: RelationKind::BelongsTo,
            related: related.into(),
            local_field: local_field.into(),
            foreign_key: None,
            local_key: Some(local_key.into()),
            parent: false,
        }
    }

    /// Marks this relation as the endpoint-hierarchy parent.
    ///
    /// Only meaningful on a `BelongsTo` relation; the registry rejects a
    /// definition with a parent flag elsewhere or on more than one
    /// relation.
    #[must_use]
    pub fn as_parent(mut self) -> Self {
        self.parent = true;
        self
    }
}
