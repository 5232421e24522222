use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::layout::{LineKind, Point};

pub type PersonId = String;
pub type RelationshipId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Gender {
    Male,
    Female,
    NonBinary,
    TransMale,
    TransFemale,
    #[default]
    Unknown,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::NonBinary => "nonBinary",
            Gender::TransMale => "transMale",
            Gender::TransFemale => "transFemale",
            Gender::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: PersonId,
    pub name: String,
    pub gender: Gender,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub death_date: Option<NaiveDate>,
    #[serde(default)]
    pub deceased: bool,
    /// The identified patient the genogram is drawn around.
    #[serde(default)]
    pub index_person: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Person {
    pub fn new(id: impl Into<PersonId>, name: impl Into<String>, gender: Gender) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            gender,
            birth_date: None,
            death_date: None,
            deceased: false,
            index_person: false,
            conditions: Vec::new(),
            notes: None,
        }
    }
}

/// Partial update for a [`Person`]. `None` leaves a field untouched; for
/// optional fields `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub birth_date: Option<Option<NaiveDate>>,
    #[serde(default)]
    pub death_date: Option<Option<NaiveDate>>,
    #[serde(default)]
    pub deceased: Option<bool>,
    #[serde(default)]
    pub index_person: Option<bool>,
    #[serde(default)]
    pub conditions: Option<Vec<String>>,
    #[serde(default)]
    pub notes: Option<Option<String>>,
}

impl PersonPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.gender.is_none()
            && self.birth_date.is_none()
            && self.death_date.is_none()
            && self.deceased.is_none()
            && self.index_person.is_none()
            && self.conditions.is_none()
            && self.notes.is_none()
    }

    /// Writes the touched fields into `person` and returns a patch holding
    /// their previous values.
    pub fn apply(&self, person: &mut Person) -> PersonPatch {
        let mut previous = PersonPatch::default();

        if let Some(name) = &self.name {
            previous.name = Some(std::mem::replace(&mut person.name, name.clone()));
        }
        if let Some(gender) = self.gender {
            previous.gender = Some(std::mem::replace(&mut person.gender, gender));
        }
        if let Some(birth_date) = self.birth_date {
            previous.birth_date = Some(std::mem::replace(&mut person.birth_date, birth_date));
        }
        if let Some(death_date) = self.death_date {
            previous.death_date = Some(std::mem::replace(&mut person.death_date, death_date));
        }
        if let Some(deceased) = self.deceased {
            previous.deceased = Some(std::mem::replace(&mut person.deceased, deceased));
        }
        if let Some(index_person) = self.index_person {
            previous.index_person = Some(std::mem::replace(&mut person.index_person, index_person));
        }
        if let Some(conditions) = &self.conditions {
            previous.conditions = Some(std::mem::replace(&mut person.conditions, conditions.clone()));
        }
        if let Some(notes) = &self.notes {
            previous.notes = Some(std::mem::replace(&mut person.notes, notes.clone()));
        }

        previous
    }

    /// Combines two patches; fields set in `newer` win.
    pub fn overlay(self, newer: PersonPatch) -> PersonPatch {
        PersonPatch {
            name: newer.name.or(self.name),
            gender: newer.gender.or(self.gender),
            birth_date: newer.birth_date.or(self.birth_date),
            death_date: newer.death_date.or(self.death_date),
            deceased: newer.deceased.or(self.deceased),
            index_person: newer.index_person.or(self.index_person),
            conditions: newer.conditions.or(self.conditions),
            notes: newer.notes.or(self.notes),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PartnerStatus {
    Married,
    Divorced,
    Separated,
    Cohabiting,
    Engaged,
    Dating,
    Widowed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChildStatus {
    Biological,
    Adopted,
    Foster,
    Step,
    Twin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EmotionalStatus {
    Close,
    Friendship,
    Distant,
    Hostile,
    Conflictual,
    Fused,
    CutOff,
    Abusive,
}

impl PartnerStatus {
    pub fn line_kind(&self) -> LineKind {
        match self {
            PartnerStatus::Married | PartnerStatus::Widowed => LineKind::Solid,
            PartnerStatus::Cohabiting | PartnerStatus::Engaged | PartnerStatus::Dating => {
                LineKind::Dashed
            }
            PartnerStatus::Divorced | PartnerStatus::Separated => LineKind::Slashed,
        }
    }
}

impl ChildStatus {
    pub fn line_kind(&self) -> LineKind {
        match self {
            ChildStatus::Biological | ChildStatus::Twin | ChildStatus::Step => LineKind::Solid,
            ChildStatus::Adopted => LineKind::Dashed,
            ChildStatus::Foster => LineKind::Dotted,
        }
    }
}

impl EmotionalStatus {
    pub fn line_kind(&self) -> LineKind {
        match self {
            EmotionalStatus::Close | EmotionalStatus::Friendship => LineKind::Double,
            EmotionalStatus::Fused => LineKind::Triple,
            EmotionalStatus::Distant => LineKind::Dotted,
            EmotionalStatus::Hostile | EmotionalStatus::Conflictual => LineKind::Zigzag,
            EmotionalStatus::Abusive => LineKind::Zigzag,
            EmotionalStatus::CutOff => LineKind::Slashed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerRelationship {
    pub id: RelationshipId,
    pub source_id: PersonId,
    pub target_id: PersonId,
    pub status: PartnerStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildRelationship {
    pub id: RelationshipId,
    pub source_id: PersonId,
    pub target_id: PersonId,
    pub status: ChildStatus,
    /// Partner relationship of the parents this child descends from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_relationship_id: Option<RelationshipId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmotionalRelationship {
    pub id: RelationshipId,
    pub source_id: PersonId,
    pub target_id: PersonId,
    pub status: EmotionalStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationshipKind {
    Partner,
    Child,
    Emotional,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Relationship {
    Partner(PartnerRelationship),
    Child(ChildRelationship),
    Emotional(EmotionalRelationship),
}

impl Relationship {
    pub fn id(&self) -> &str {
        match self {
            Relationship::Partner(rel) => &rel.id,
            Relationship::Child(rel) => &rel.id,
            Relationship::Emotional(rel) => &rel.id,
        }
    }

    pub fn source_id(&self) -> &str {
        match self {
            Relationship::Partner(rel) => &rel.source_id,
            Relationship::Child(rel) => &rel.source_id,
            Relationship::Emotional(rel) => &rel.source_id,
        }
    }

    pub fn target_id(&self) -> &str {
        match self {
            Relationship::Partner(rel) => &rel.target_id,
            Relationship::Child(rel) => &rel.target_id,
            Relationship::Emotional(rel) => &rel.target_id,
        }
    }

    pub fn kind(&self) -> RelationshipKind {
        match self {
            Relationship::Partner(_) => RelationshipKind::Partner,
            Relationship::Child(_) => RelationshipKind::Child,
            Relationship::Emotional(_) => RelationshipKind::Emotional,
        }
    }

    pub fn involves(&self, person_id: &str) -> bool {
        self.source_id() == person_id || self.target_id() == person_id
    }

    pub fn line_kind(&self) -> LineKind {
        match self {
            Relationship::Partner(rel) => rel.status.line_kind(),
            Relationship::Child(rel) => rel.status.line_kind(),
            Relationship::Emotional(rel) => rel.status.line_kind(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStyle {
    pub background_color: String,
    pub border_color: String,
    pub text_color: String,
    #[serde(default = "default_font_size")]
    pub font_size: f32,
}

fn default_font_size() -> f32 {
    14.0
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            background_color: "#fffbea".to_string(),
            border_color: "#d69e2e".to_string(),
            text_color: "#1a202c".to_string(),
            font_size: default_font_size(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextAnnotation {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub style: TextStyle,
    pub position: Point,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextAnnotationPatch {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub style: Option<TextStyle>,
    #[serde(default)]
    pub width: Option<Option<f32>>,
}

impl TextAnnotationPatch {
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.style.is_none() && self.width.is_none()
    }

    pub fn apply(&self, annotation: &mut TextAnnotation) -> TextAnnotationPatch {
        let mut previous = TextAnnotationPatch::default();
        if let Some(text) = &self.text {
            previous.text = Some(std::mem::replace(&mut annotation.text, text.clone()));
        }
        if let Some(style) = &self.style {
            previous.style = Some(std::mem::replace(&mut annotation.style, style.clone()));
        }
        if let Some(width) = self.width {
            previous.width = Some(std::mem::replace(&mut annotation.width, width));
        }
        previous
    }

    pub fn overlay(self, newer: TextAnnotationPatch) -> TextAnnotationPatch {
        TextAnnotationPatch {
            text: newer.text.or(self.text),
            style: newer.style.or(self.style),
            width: newer.width.or(self.width),
        }
    }
}

/// A member of a [`FamilyTree`], keyed by the person it stands for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyTreeNode {
    pub person_id: PersonId,
    #[serde(default)]
    pub generation: i32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parent_ids: Vec<PersonId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub partner_ids: Vec<PersonId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub child_ids: Vec<PersonId>,
}

impl FamilyTreeNode {
    pub fn new(person_id: impl Into<PersonId>, generation: i32) -> Self {
        Self {
            person_id: person_id.into(),
            generation,
            parent_ids: Vec::new(),
            partner_ids: Vec::new(),
            child_ids: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FamilyTree {
    pub id: String,
    pub name: String,
    pub root_person_id: PersonId,
    pub nodes: BTreeMap<PersonId, FamilyTreeNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenogramMetadata {
    pub title: String,
    pub author: Option<String>,
    pub version: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GenogramMetadata {
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            title: title.into(),
            author: None,
            version: "1.0".to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Aggregate root owning every graph entity by ID.
#[derive(Debug, Clone, PartialEq)]
pub struct Genogram {
    pub id: String,
    pub metadata: GenogramMetadata,
    pub persons: BTreeMap<PersonId, Person>,
    pub relationships: BTreeMap<RelationshipId, Relationship>,
    pub text_annotations: BTreeMap<String, TextAnnotation>,
    pub family_trees: BTreeMap<String, FamilyTree>,
}

impl Default for Genogram {
    fn default() -> Self {
        Self::new("Untitled genogram")
    }
}

impl Genogram {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: crate::new_id(),
            metadata: GenogramMetadata::new(title),
            persons: BTreeMap::new(),
            relationships: BTreeMap::new(),
            text_annotations: BTreeMap::new(),
            family_trees: BTreeMap::new(),
        }
    }

    pub fn touch(&mut self) {
        self.metadata.updated_at = Utc::now();
    }

    /// Relationships touching `person_id`, keyed as stored.
    pub fn relationships_of<'a>(
        &'a self,
        person_id: &'a str,
    ) -> impl Iterator<Item = (&'a RelationshipId, &'a Relationship)> + 'a {
        self.relationships
            .iter()
            .filter(move |(_, relationship)| relationship.involves(person_id))
    }

    /// True when every relationship endpoint refers to an existing person.
    pub fn is_consistent(&self) -> bool {
        self.relationships.values().all(|relationship| {
            self.persons.contains_key(relationship.source_id())
                && self.persons.contains_key(relationship.target_id())
        })
    }
}
