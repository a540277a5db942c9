//! Form Control Properties
//!
//! Inputs, options and textareas carry live state that is not purely
//! attribute-driven: a typed value, a toggled checkbox or a picked option
//! diverge from their attributes until re-rendered. Each element keeps
//! "dirty" overrides here; unset overrides fall back to the attributes.

use crate::{DomResult, DomTree, NodeId};

/// HTML input types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputType {
    #[default]
    Text,
    Password,
    Email,
    Number,
    Tel,
    Url,
    Search,
    Date,
    Time,
    DatetimeLocal,
    Month,
    Week,
    Color,
    Range,
    File,
    Hidden,
    Checkbox,
    Radio,
    Submit,
    Reset,
    Button,
    Image,
}

impl InputType {
    /// Parse from the `type` attribute; unknown values fall back to text
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "password" => Self::Password,
            "email" => Self::Email,
            "number" => Self::Number,
            "tel" => Self::Tel,
            "url" => Self::Url,
            "search" => Self::Search,
            "date" => Self::Date,
            "time" => Self::Time,
            "datetime-local" => Self::DatetimeLocal,
            "month" => Self::Month,
            "week" => Self::Week,
            "color" => Self::Color,
            "range" => Self::Range,
            "file" => Self::File,
            "hidden" => Self::Hidden,
            "checkbox" => Self::Checkbox,
            "radio" => Self::Radio,
            "submit" => Self::Submit,
            "reset" => Self::Reset,
            "button" => Self::Button,
            "image" => Self::Image,
            _ => Self::Text,
        }
    }

    /// Checkbox and radio default their value to "on"
    pub fn is_checkable(&self) -> bool {
        matches!(self, Self::Checkbox | Self::Radio)
    }
}

/// Dirty property overrides of a form control
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlState {
    /// Value set through the property (input, textarea)
    pub value: Option<String>,
    /// Checkedness set through the property
    pub checked: Option<bool>,
    /// Selectedness set through the property (option)
    pub selected: Option<bool>,
    /// Indeterminate flag (property only)
    pub indeterminate: bool,
}

impl DomTree {
    fn controls(&self, id: NodeId) -> DomResult<&ControlState> {
        Ok(&self.element(id)?.controls)
    }

    fn controls_mut(&mut self, id: NodeId) -> DomResult<&mut ControlState> {
        Ok(&mut self.element_mut(id)?.controls)
    }

    /// Parsed `type` of an input element
    pub fn input_type(&self, id: NodeId) -> InputType {
        self.get_attribute(id, "type")
            .map(InputType::parse)
            .unwrap_or_default()
    }

    /// Current value of an input element
    pub fn input_value(&self, id: NodeId) -> DomResult<String> {
        if let Some(value) = &self.controls(id)?.value {
            return Ok(value.clone());
        }
        if let Some(value) = self.get_attribute(id, "value") {
            return Ok(value.to_string());
        }
        if self.input_type(id).is_checkable() {
            return Ok("on".to_string());
        }
        Ok(String::new())
    }

    /// Set the live value of an input element
    pub fn set_input_value(&mut self, id: NodeId, value: &str) -> DomResult<()> {
        self.controls_mut(id)?.value = Some(value.to_string());
        Ok(())
    }

    /// Checkedness of an input element
    pub fn checked(&self, id: NodeId) -> DomResult<bool> {
        let dirty = self.controls(id)?.checked;
        Ok(dirty.unwrap_or_else(|| self.has_attribute(id, "checked")))
    }

    /// Set the live checkedness
    pub fn set_checked(&mut self, id: NodeId, checked: bool) -> DomResult<()> {
        self.controls_mut(id)?.checked = Some(checked);
        Ok(())
    }

    /// Disabled state (reflects the attribute)
    pub fn disabled(&self, id: NodeId) -> DomResult<bool> {
        self.element(id)?;
        Ok(self.has_attribute(id, "disabled"))
    }

    /// Toggle the disabled attribute
    pub fn set_disabled(&mut self, id: NodeId, disabled: bool) -> DomResult<()> {
        if disabled {
            self.set_attribute(id, "disabled", "")
        } else {
            self.remove_attribute(id, "disabled").map(|_| ())
        }
    }

    /// Indeterminate flag of a checkbox
    pub fn indeterminate(&self, id: NodeId) -> DomResult<bool> {
        Ok(self.controls(id)?.indeterminate)
    }

    pub fn set_indeterminate(&mut self, id: NodeId, indeterminate: bool) -> DomResult<()> {
        self.controls_mut(id)?.indeterminate = indeterminate;
        Ok(())
    }

    /// Selectedness of an option element
    pub fn selected(&self, id: NodeId) -> DomResult<bool> {
        let dirty = self.controls(id)?.selected;
        Ok(dirty.unwrap_or_else(|| self.has_attribute(id, "selected")))
    }

    pub fn set_selected(&mut self, id: NodeId, selected: bool) -> DomResult<()> {
        self.controls_mut(id)?.selected = Some(selected);
        Ok(())
    }

    /// Current value of a textarea (dirty value, else its text)
    pub fn textarea_value(&self, id: NodeId) -> DomResult<String> {
        match &self.controls(id)?.value {
            Some(value) => Ok(value.clone()),
            None => Ok(self.text_content(id)),
        }
    }

    pub fn set_textarea_value(&mut self, id: NodeId, value: &str) -> DomResult<()> {
        self.controls_mut(id)?.value = Some(value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_type_parse() {
        assert_eq!(InputType::parse("range"), InputType::Range);
        assert_eq!(InputType::parse(" FILE "), InputType::File);
        assert_eq!(InputType::parse("bogus"), InputType::Text);
    }

    #[test]
    fn test_value_falls_back_to_attribute() {
        let mut tree = DomTree::new();
        let input = tree.create_element("input");

        assert_eq!(tree.input_value(input).unwrap(), "");
        tree.set_attribute(input, "value", "a").unwrap();
        assert_eq!(tree.input_value(input).unwrap(), "a");

        tree.set_input_value(input, "typed").unwrap();
        tree.set_attribute(input, "value", "b").unwrap();
        assert_eq!(tree.input_value(input).unwrap(), "typed");
    }

    #[test]
    fn test_checkbox_defaults_to_on() {
        let mut tree = DomTree::new();
        let input = tree.create_element("input");
        tree.set_attribute(input, "type", "checkbox").unwrap();
        assert_eq!(tree.input_value(input).unwrap(), "on");
    }

    #[test]
    fn test_checked_dirty_override() {
        let mut tree = DomTree::new();
        let input = tree.create_element("input");
        tree.set_attribute(input, "checked", "").unwrap();
        assert!(tree.checked(input).unwrap());

        tree.set_checked(input, false).unwrap();
        assert!(!tree.checked(input).unwrap());
        assert!(tree.has_attribute(input, "checked"));
    }

    #[test]
    fn test_disabled_reflects_attribute() {
        let mut tree = DomTree::new();
        let button = tree.create_element("button");
        tree.set_disabled(button, true).unwrap();
        assert!(tree.has_attribute(button, "disabled"));
        tree.set_disabled(button, false).unwrap();
        assert!(!tree.disabled(button).unwrap());
    }

    #[test]
    fn test_textarea_value_from_text() {
        let mut tree = DomTree::new();
        let area = tree.create_element("textarea");
        let text = tree.create_text("hello");
        tree.append_child(area, text).unwrap();

        assert_eq!(tree.textarea_value(area).unwrap(), "hello");
        tree.set_textarea_value(area, "edited").unwrap();
        assert_eq!(tree.textarea_value(area).unwrap(), "edited");
    }

    #[test]
    fn test_properties_require_element() {
        let mut tree = DomTree::new();
        let text = tree.create_text("x");
        assert!(tree.checked(text).is_err());
    }
}
