//! JSON persistence. ID-keyed maps are written as arrays of `[id, entity]`
//! pairs; each family tree carries its own `[personId, node]` array. The
//! `layout` section is optional and is rebuilt from the graph when absent.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::engine::{LayoutConfig, LayoutEngine};
use crate::error::{GenogramError, Result};
use crate::layout::{EdgeLayout, EdgeStyle, EditorState, LayoutState, NodeLayout, Point};
use crate::model::{
    FamilyTree, FamilyTreeNode, Genogram, GenogramMetadata, Person, Relationship, TextAnnotation,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedMetadata {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default = "default_version")]
    pub version: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_version() -> String {
    "1.0".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedFamilyTree {
    pub id: String,
    pub name: String,
    pub root_person_id: String,
    #[serde(default)]
    pub nodes: Vec<(String, FamilyTreeNode)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedGenogram {
    pub id: String,
    pub metadata: SerializedMetadata,
    #[serde(default)]
    pub persons: Vec<(String, Person)>,
    #[serde(default)]
    pub relationships: Vec<(String, Relationship)>,
    #[serde(default)]
    pub text_annotations: Vec<(String, TextAnnotation)>,
    #[serde(default)]
    pub family_trees: Vec<(String, SerializedFamilyTree)>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedLayout {
    #[serde(default)]
    pub nodes: Vec<(String, NodeLayout)>,
    #[serde(default)]
    pub edges: Vec<(String, EdgeLayout)>,
}

/// A genogram plus its diagram geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedDocument {
    #[serde(flatten)]
    pub genogram: SerializedGenogram,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<SerializedLayout>,
}

fn pairs<T: Clone>(map: &BTreeMap<String, T>) -> Vec<(String, T)> {
    map.iter().map(|(id, value)| (id.clone(), value.clone())).collect()
}

/// Builds a map from `[key, entity]` pairs. Every key must equal the id the
/// entity carries.
fn keyed<T>(
    collection: &'static str,
    entries: Vec<(String, T)>,
    id_of: impl Fn(&T) -> &str,
) -> Result<BTreeMap<String, T>> {
    entries
        .into_iter()
        .map(|(key, value)| {
            if key != id_of(&value) {
                return Err(GenogramError::IdMismatch {
                    collection,
                    id: id_of(&value).to_string(),
                    key,
                });
            }
            Ok((key, value))
        })
        .collect()
}

impl SerializedGenogram {
    pub fn from_genogram(genogram: &Genogram) -> Self {
        let metadata = &genogram.metadata;
        Self {
            id: genogram.id.clone(),
            metadata: SerializedMetadata {
                title: metadata.title.clone(),
                author: metadata.author.clone(),
                version: metadata.version.clone(),
                created_at: metadata.created_at,
                updated_at: metadata.updated_at,
            },
            persons: pairs(&genogram.persons),
            relationships: pairs(&genogram.relationships),
            text_annotations: pairs(&genogram.text_annotations),
            family_trees: genogram
                .family_trees
                .iter()
                .map(|(id, tree)| {
                    (
                        id.clone(),
                        SerializedFamilyTree {
                            id: tree.id.clone(),
                            name: tree.name.clone(),
                            root_person_id: tree.root_person_id.clone(),
                            nodes: pairs(&tree.nodes),
                        },
                    )
                })
                .collect(),
        }
    }

    pub fn into_genogram(self) -> Result<Genogram> {
        if self.id.trim().is_empty() {
            return Err(GenogramError::MissingField("id"));
        }

        let mut family_trees = BTreeMap::new();
        for (key, tree) in self.family_trees {
            if key != tree.id {
                return Err(GenogramError::IdMismatch {
                    collection: "familyTrees",
                    key,
                    id: tree.id,
                });
            }
            let nodes = keyed("familyTrees.nodes", tree.nodes, |node| node.person_id.as_str())?;
            family_trees.insert(
                key,
                FamilyTree {
                    id: tree.id,
                    name: tree.name,
                    root_person_id: tree.root_person_id,
                    nodes,
                },
            );
        }

        let metadata = self.metadata;
        let genogram = Genogram {
            id: self.id,
            metadata: GenogramMetadata {
                title: metadata.title,
                author: metadata.author,
                version: metadata.version,
                created_at: metadata.created_at,
                updated_at: metadata.updated_at,
            },
            persons: keyed("persons", self.persons, |person| person.id.as_str())?,
            relationships: keyed("relationships", self.relationships, Relationship::id)?,
            text_annotations: keyed("textAnnotations", self.text_annotations, |annotation| {
                annotation.id.as_str()
            })?,
            family_trees,
        };

        if !genogram.is_consistent() {
            warn!(genogram = %genogram.id, "relationships reference missing persons");
        }
        Ok(genogram)
    }
}

impl SerializedDocument {
    pub fn from_state(state: &EditorState) -> Self {
        Self {
            genogram: SerializedGenogram::from_genogram(&state.genogram),
            layout: Some(SerializedLayout {
                nodes: pairs(&state.layout.nodes),
                edges: pairs(&state.layout.edges),
            }),
        }
    }

    /// Rebuilds editor state. Missing layout entries are synthesized with
    /// `config`; entries for unknown IDs are dropped.
    pub fn into_state(self, config: &LayoutConfig) -> Result<EditorState> {
        let genogram = self.genogram.into_genogram()?;
        let mut layout = match self.layout {
            Some(layout) => LayoutState {
                nodes: layout.nodes.into_iter().collect(),
                edges: layout.edges.into_iter().collect(),
            },
            None => synthesize_layout(&genogram, config),
        };
        reconcile_layout(&genogram, &mut layout, config);

        info!(
            genogram = %genogram.id,
            persons = genogram.persons.len(),
            relationships = genogram.relationships.len(),
            "loaded genogram"
        );
        Ok(EditorState { genogram, layout })
    }
}

pub fn genogram_to_json(genogram: &Genogram) -> Result<String> {
    Ok(serde_json::to_string_pretty(&SerializedGenogram::from_genogram(genogram))?)
}

pub fn genogram_from_json(raw: &str) -> Result<Genogram> {
    let serialized: SerializedGenogram = serde_json::from_str(raw)?;
    serialized.into_genogram()
}

pub fn state_to_json(state: &EditorState) -> Result<String> {
    Ok(serde_json::to_string_pretty(&SerializedDocument::from_state(state))?)
}

pub fn state_from_json(raw: &str, config: &LayoutConfig) -> Result<EditorState> {
    let document: SerializedDocument = serde_json::from_str(raw)?;
    document.into_state(config)
}

/// Generation of each person as recorded by the first family tree listing
/// them.
fn generations(genogram: &Genogram) -> BTreeMap<&str, i32> {
    let mut generations = BTreeMap::new();
    for tree in genogram.family_trees.values() {
        for (person_id, node) in &tree.nodes {
            generations.entry(person_id.as_str()).or_insert(node.generation);
        }
    }
    generations
}

fn synthesize_layout(genogram: &Genogram, config: &LayoutConfig) -> LayoutState {
    let engine = LayoutEngine::new(*config);
    let generations = generations(genogram);

    let mut layout = LayoutState::default();
    for id in genogram.persons.keys() {
        let generation = generations.get(id.as_str()).copied().unwrap_or(0);
        layout
            .nodes
            .insert(id.clone(), NodeLayout::new(Point::default(), generation));
    }
    engine.auto_layout_by_generation(&mut layout);
    layout
}

fn reconcile_layout(genogram: &Genogram, layout: &mut LayoutState, config: &LayoutConfig) {
    let engine = LayoutEngine::new(*config);

    let before = (layout.nodes.len(), layout.edges.len());
    layout
        .nodes
        .retain(|id, _| genogram.persons.contains_key(id));
    layout
        .edges
        .retain(|id, _| genogram.relationships.contains_key(id));
    if (layout.nodes.len(), layout.edges.len()) != before {
        warn!("dropped layout entries without a matching person or relationship");
    }

    let generations = generations(genogram);
    for id in genogram.persons.keys() {
        if layout.nodes.contains_key(id) {
            continue;
        }
        let generation = generations.get(id.as_str()).copied().unwrap_or(0);
        let preferred = Point::new(
            config.center_x,
            engine.get_generation_y(generation, config.base_y),
        );
        let position = engine.find_non_colliding_position(preferred, &layout.nodes, None);
        layout
            .nodes
            .insert(id.clone(), NodeLayout::new(position, generation));
    }

    // Partner edges first so child edges can hang from their anchors.
    let mut missing: Vec<&Relationship> = genogram
        .relationships
        .values()
        .filter(|relationship| !layout.edges.contains_key(relationship.id()))
        .collect();
    missing.sort_by_key(|relationship| !matches!(relationship, Relationship::Partner(_)));

    for relationship in missing {
        let (Some(source), Some(target)) = (
            layout.position_of(relationship.source_id()),
            layout.position_of(relationship.target_id()),
        ) else {
            continue;
        };
        let edge = route_edge(&engine, relationship, source, target, &layout.edges);
        layout.edges.insert(relationship.id().to_string(), edge);
    }
}

fn route_edge(
    engine: &LayoutEngine,
    relationship: &Relationship,
    source: Point,
    target: Point,
    edges: &BTreeMap<String, EdgeLayout>,
) -> EdgeLayout {
    let style = EdgeStyle::with_line(relationship.line_kind());
    match relationship {
        Relationship::Partner(_) => {
            let mut edge = EdgeLayout::new(engine.calculate_edge_path(source, target, false), style);
            edge.virtual_anchor = Some(engine.calculate_virtual_anchor(source, target));
            edge
        }
        Relationship::Child(child) => {
            let start = child
                .parent_relationship_id
                .as_ref()
                .and_then(|partner_id| edges.get(partner_id))
                .and_then(|edge| edge.virtual_anchor)
                .unwrap_or(source);
            EdgeLayout::new(engine.calculate_edge_path(start, target, true), style)
        }
        Relationship::Emotional(_) => {
            EdgeLayout::new(engine.calculate_edge_path(source, target, false), style)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        ChildRelationship, ChildStatus, EmotionalRelationship, EmotionalStatus, Gender,
        PartnerRelationship, PartnerStatus, TextStyle,
    };
    use serde_json::Value;

    fn sample() -> Genogram {
        let mut genogram = Genogram::new("Sample");
        genogram.metadata.author = Some("Dr. Lee".into());
        for (id, name) in [("a", "Ann"), ("b", "Bob"), ("c", "Cy")] {
            genogram
                .persons
                .insert(id.into(), Person::new(id, name, Gender::Unknown));
        }
        genogram.relationships.insert(
            "ab".into(),
            Relationship::Partner(PartnerRelationship {
                id: "ab".into(),
                source_id: "a".into(),
                target_id: "b".into(),
                status: PartnerStatus::Married,
            }),
        );
        genogram.relationships.insert(
            "ac".into(),
            Relationship::Child(ChildRelationship {
                id: "ac".into(),
                source_id: "a".into(),
                target_id: "c".into(),
                status: ChildStatus::Biological,
                parent_relationship_id: Some("ab".into()),
            }),
        );
        genogram.relationships.insert(
            "bc".into(),
            Relationship::Emotional(EmotionalRelationship {
                id: "bc".into(),
                source_id: "b".into(),
                target_id: "c".into(),
                status: EmotionalStatus::Conflictual,
            }),
        );
        genogram.text_annotations.insert(
            "n".into(),
            TextAnnotation {
                id: "n".into(),
                text: "Moved abroad 1998".into(),
                style: TextStyle::default(),
                position: Point::new(-40.0, 12.5),
                width: Some(160.0),
            },
        );
        let mut nodes = BTreeMap::new();
        nodes.insert("a".to_string(), FamilyTreeNode::new("a", 0));
        nodes.insert("b".to_string(), FamilyTreeNode::new("b", 0));
        nodes.insert("c".to_string(), FamilyTreeNode::new("c", 1));
        genogram.family_trees.insert(
            "t".into(),
            FamilyTree {
                id: "t".into(),
                name: "Core".into(),
                root_person_id: "a".into(),
                nodes,
            },
        );
        genogram
    }

    #[test]
    fn collections_are_pair_arrays() {
        let json = genogram_to_json(&sample()).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["persons"][0][0], "a");
        assert_eq!(value["persons"][0][1]["name"], "Ann");
        assert_eq!(value["relationships"][0][1]["type"], "partner");
        assert_eq!(value["familyTrees"][0][1]["nodes"][2][0], "c");
        assert!(value["metadata"]["createdAt"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn genogram_round_trip_is_lossless() {
        let genogram = sample();
        let kinds: std::collections::HashSet<_> =
            genogram.relationships.values().map(Relationship::kind).collect();
        assert_eq!(kinds.len(), 3);
        assert!(!genogram.text_annotations.is_empty());

        let back = genogram_from_json(&genogram_to_json(&genogram).unwrap()).unwrap();
        assert_eq!(back, genogram);
        assert_eq!(back.metadata.author.as_deref(), Some("Dr. Lee"));
        assert_eq!(back.metadata.created_at, genogram.metadata.created_at);
    }

    #[test]
    fn pair_key_must_match_entity_id() {
        let raw = r#"{
            "id": "g1",
            "metadata": {
                "title": "Keys",
                "createdAt": "2024-01-01T00:00:00Z",
                "updatedAt": "2024-01-01T00:00:00Z"
            },
            "persons": [
                ["p1", { "id": "p1", "name": "Ann", "gender": "female" }],
                ["p2", { "id": "p2", "name": "Bob", "gender": "male" }]
            ],
            "relationships": [
                ["k1", { "type": "partner", "id": "r1", "sourceId": "p1", "targetId": "p2", "status": "married" }]
            ]
        }"#;

        match state_from_json(raw, &LayoutConfig::default()) {
            Err(GenogramError::IdMismatch { collection, key, id }) => {
                assert_eq!(collection, "relationships");
                assert_eq!(key, "k1");
                assert_eq!(id, "r1");
            }
            other => panic!("expected id mismatch, got {other:?}"),
        }

        let fixed = raw.replace(r#"["k1""#, r#"["r1""#);
        let state = state_from_json(&fixed, &LayoutConfig::default()).unwrap();
        assert!(state.is_in_lockstep());
    }

    #[test]
    fn empty_collections_may_be_omitted() {
        let raw = r#"{
            "id": "g1",
            "metadata": {
                "title": "Empty",
                "createdAt": "2024-01-01T00:00:00Z",
                "updatedAt": "2024-01-02T00:00:00Z"
            }
        }"#;
        let genogram = genogram_from_json(raw).unwrap();
        assert!(genogram.persons.is_empty());
        assert_eq!(genogram.metadata.version, "1.0");
    }

    #[test]
    fn blank_id_is_rejected() {
        let raw = r#"{
            "id": "  ",
            "metadata": {
                "title": "x",
                "createdAt": "2024-01-01T00:00:00Z",
                "updatedAt": "2024-01-01T00:00:00Z"
            }
        }"#;
        assert!(matches!(
            genogram_from_json(raw),
            Err(GenogramError::MissingField("id"))
        ));
        assert!(matches!(genogram_from_json("{"), Err(GenogramError::Json(_))));
    }

    #[test]
    fn missing_layout_is_synthesized_from_generations() {
        let json = genogram_to_json(&sample()).unwrap();
        let config = LayoutConfig::default();

        let state = state_from_json(&json, &config).unwrap();

        assert!(state.is_in_lockstep());
        assert_eq!(state.layout.nodes["a"].position, Point::new(330.0, 100.0));
        assert_eq!(state.layout.nodes["b"].position, Point::new(470.0, 100.0));
        assert_eq!(state.layout.nodes["c"].position, Point::new(400.0, 250.0));

        let partner = &state.layout.edges["ab"];
        assert_eq!(partner.virtual_anchor, Some(Point::new(400.0, 100.0)));
        let child = &state.layout.edges["ac"];
        assert_eq!(child.points.first(), Some(&Point::new(400.0, 100.0)));
        assert_eq!(child.points.len(), 4);
    }

    #[test]
    fn state_round_trip_keeps_layout() {
        let mut state = state_from_json(&genogram_to_json(&sample()).unwrap(), &LayoutConfig::default())
            .unwrap();
        state.layout.nodes.get_mut("a").unwrap().position = Point::new(1.5, -2.25);
        state.layout.edges.get_mut("ab").unwrap().label = Some("m. 1990".into());

        let back = state_from_json(&state_to_json(&state).unwrap(), &LayoutConfig::default()).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn stray_layout_entries_are_dropped() {
        let mut document = SerializedDocument::from_state(
            &state_from_json(&genogram_to_json(&sample()).unwrap(), &LayoutConfig::default())
                .unwrap(),
        );
        if let Some(layout) = document.layout.as_mut() {
            layout
                .nodes
                .push(("ghost".into(), NodeLayout::new(Point::default(), 0)));
            layout.nodes.retain(|(id, _)| id != "c");
        }

        let state = document.into_state(&LayoutConfig::default()).unwrap();
        assert!(state.is_in_lockstep());
        assert!(!state.layout.nodes.contains_key("ghost"));
        assert!(state.layout.nodes.contains_key("c"));
    }
}
