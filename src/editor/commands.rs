use crate::history::{ActionType, HistoryError, HistoryEvent, Payload, TargetType};
use serde::{Deserialize, Serialize};

pub const META_TOOL: &str = "tool";

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: [f32; 3],
    pub rotation: [f32; 3],
    pub scale: [f32; 3],
}

/// A node in the scene tree as seen by history: stable id plus display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneNodeRef {
    pub id: String,
    pub name: String,
    pub kind: TargetType,
}

impl SceneNodeRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: TargetType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformEdit {
    pub node: SceneNodeRef,
    pub before: Transform,
    pub after: Transform,
    pub tool: Option<String>,
}

impl TransformEdit {
    pub fn new(node: SceneNodeRef, before: Transform, after: Transform) -> Self {
        Self {
            node,
            before,
            after,
            tool: None,
        }
    }

    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tool = Some(tool.into());
        self
    }

    pub fn to_event(&self) -> Result<HistoryEvent, HistoryError> {
        let description = format!("Transform {}", self.node.name);
        let mut event = HistoryEvent::new(
            ActionType::Transform,
            self.node.kind,
            self.node.name.clone(),
            description,
        )
        .with_target_id(self.node.id.clone())
        .with_values(
            Some(Payload::encode(&self.before)?),
            Some(Payload::encode(&self.after)?),
        );
        if let Some(tool) = &self.tool {
            event = event.with_metadata(META_TOOL, serde_json::Value::from(tool.as_str()));
        }
        Ok(event)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameEdit {
    pub node: SceneNodeRef,
    pub new_name: String,
}

impl RenameEdit {
    pub fn new(node: SceneNodeRef, new_name: impl Into<String>) -> Self {
        Self {
            node,
            new_name: new_name.into(),
        }
    }

    pub fn to_event(&self) -> Result<HistoryEvent, HistoryError> {
        let description = format!("Rename {} to {}", self.node.name, self.new_name);
        Ok(HistoryEvent::new(
            ActionType::Modify,
            self.node.kind,
            self.new_name.clone(),
            description,
        )
        .with_target_id(self.node.id.clone())
        .with_values(
            Some(Payload::encode(&self.node.name)?),
            Some(Payload::encode(&self.new_name)?),
        ))
    }
}

/// A single named property change on a material or light, e.g. roughness or
/// intensity. Values are kept as JSON so any inspector field fits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyEdit {
    pub node: SceneNodeRef,
    pub property: String,
    pub before: serde_json::Value,
    pub after: serde_json::Value,
}

impl PropertyEdit {
    pub fn new(
        node: SceneNodeRef,
        property: impl Into<String>,
        before: serde_json::Value,
        after: serde_json::Value,
    ) -> Self {
        Self {
            node,
            property: property.into(),
            before,
            after,
        }
    }

    fn action_type(&self) -> ActionType {
        match self.node.kind {
            TargetType::Material | TargetType::Texture => ActionType::Material,
            TargetType::Light | TargetType::Environment => ActionType::Lighting,
            TargetType::Camera => ActionType::Camera,
            TargetType::Scene => ActionType::Scene,
            _ => ActionType::Modify,
        }
    }

    pub fn to_event(&self) -> HistoryEvent {
        let description = format!("Set {} {}", self.node.name, self.property);
        HistoryEvent::new(
            self.action_type(),
            self.node.kind,
            self.node.name.clone(),
            description,
        )
        .with_target_id(self.node.id.clone())
        .with_old_value(self.before.clone())
        .with_new_value(self.after.clone())
        .with_metadata("property", serde_json::Value::from(self.property.as_str()))
    }

    /// Debounce key scoped to the property, so dragging two sliders on the
    /// same node produces two records.
    pub fn coalesce_key(&self) -> String {
        format!("{}:{}:{}", self.action_type(), self.node.id, self.property)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cube() -> SceneNodeRef {
        SceneNodeRef::new("obj-1", "Cube", TargetType::Mesh)
    }

    #[test]
    fn transform_edit_encodes_both_states() {
        let after = Transform {
            position: [1.0, 0.0, 0.0],
            ..Transform::default()
        };
        let event = TransformEdit::new(cube(), Transform::default(), after)
            .with_tool("gizmo")
            .to_event()
            .expect("encode transform");

        assert_eq!(event.action_type, ActionType::Transform);
        assert_eq!(event.target_id.as_deref(), Some("obj-1"));
        let decoded: Transform = event
            .new_value
            .as_ref()
            .expect("new value")
            .decode()
            .expect("decode transform");
        assert_eq!(decoded, after);
        assert_eq!(event.metadata.get(META_TOOL), Some(&json!("gizmo")));
    }

    #[test]
    fn rename_edit_targets_new_name() {
        let event = RenameEdit::new(cube(), "Crate").to_event().expect("rename");
        assert_eq!(event.target_name, "Crate");
        assert_eq!(event.description, "Rename Cube to Crate");
        assert_eq!(
            event.old_value.as_ref().map(Payload::as_value),
            Some(&json!("Cube"))
        );
    }

    #[test]
    fn property_edit_classifies_by_target_kind() {
        let light = SceneNodeRef::new("light-1", "Sun", TargetType::Light);
        let edit = PropertyEdit::new(light, "intensity", json!(1.0), json!(2.5));
        let event = edit.to_event();
        assert_eq!(event.action_type, ActionType::Lighting);
        assert_eq!(event.description, "Set Sun intensity");
        assert_eq!(edit.coalesce_key(), "lighting:light-1:intensity");
        assert!(event.validate().is_ok());
    }
}
