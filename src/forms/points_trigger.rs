use crate::forms::{FieldSpec, FieldType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::{IntoParams, ToSchema};

pub const FORM_NAME: &str = "leadpoints_trigger";
pub const FIELD_NAME: &str = "points";
pub const LABEL_KEY: &str = "mautic.lead.lead.event.pointtrigger";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PointsTriggerData {
    pub points: Option<i64>,
}

/// The "points trigger" value of a lead-scoring rule. Range checks belong to
/// whatever evaluates the rule, not to the field.
pub fn describe(initial: &PointsTriggerData) -> FieldSpec {
    FieldSpec {
        name: FIELD_NAME.to_string(),
        full_name: format!("{}[{}]", FORM_NAME, FIELD_NAME),
        field_type: FieldType::Number,
        precision: 0,
        label: LABEL_KEY.to_string(),
        attr: class_attr("form-control"),
        label_attr: class_attr("control-label"),
        data: initial.points.unwrap_or(0),
    }
}

fn class_attr(class: &str) -> BTreeMap<String, String> {
    BTreeMap::from([("class".to_string(), class.to_string())])
}
