use serde::{Deserialize, Serialize};
use serenity::all::{CommandOptionType, CreateCommand, CreateCommandOption};

use crate::{constant::limits, error::LoadError};

/// The registration payload a command module declares in its `data` table
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommandDefinition {
    #[serde(default)]
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub options: Vec<CommandOptionDefinition>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommandOptionDefinition {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: OptionKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u16>,
    #[serde(default)]
    pub autocomplete: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Choice>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionKind {
    String,
    Integer,
    Number,
    Boolean,
    User,
    Channel,
    Role,
    Mentionable,
    Attachment,
}
impl From<OptionKind> for CommandOptionType {
    fn from(kind: OptionKind) -> Self {
        match kind {
            OptionKind::String => CommandOptionType::String,
            OptionKind::Integer => CommandOptionType::Integer,
            OptionKind::Number => CommandOptionType::Number,
            OptionKind::Boolean => CommandOptionType::Boolean,
            OptionKind::User => CommandOptionType::User,
            OptionKind::Channel => CommandOptionType::Channel,
            OptionKind::Role => CommandOptionType::Role,
            OptionKind::Mentionable => CommandOptionType::Mentionable,
            OptionKind::Attachment => CommandOptionType::Attachment,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub name: String,
    pub value: ChoiceValue,
}

/// A choice's value; its variant has to match the kind of option it belongs to
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChoiceValue {
    Integer(i64),
    Number(f64),
    String(String),
}

impl CommandDefinition {
    pub fn validate(&self) -> Result<(), LoadError> {
        if self.name.trim().is_empty() {
            return Err(LoadError::InvalidDefinition(
                "command name must not be empty".to_string(),
            ));
        }
        if self.options.len() > limits::MAX_OPTIONS {
            return Err(LoadError::InvalidDefinition(format!(
                "command '{}' has {} options, but Discord allows a maximum of {}",
                self.name,
                self.options.len(),
                limits::MAX_OPTIONS
            )));
        }
        for opt in &self.options {
            if opt.choices.len() > limits::MAX_CHOICES {
                return Err(LoadError::InvalidDefinition(format!(
                    "option '{}' has {} choices, but Discord allows a maximum of {}",
                    opt.name,
                    opt.choices.len(),
                    limits::MAX_CHOICES
                )));
            }
            for choice in &opt.choices {
                let fits = match (opt.kind, &choice.value) {
                    (OptionKind::String, ChoiceValue::String(_)) => true,
                    (OptionKind::Integer, ChoiceValue::Integer(value)) => {
                        i32::try_from(*value).is_ok()
                    }
                    (OptionKind::Number, ChoiceValue::Integer(_) | ChoiceValue::Number(_)) => true,
                    _ => false,
                };
                if !fits {
                    return Err(LoadError::InvalidDefinition(format!(
                        "choice '{}' of option '{}' does not fit a {:?} option",
                        choice.name, opt.name, opt.kind
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn to_discord_command(&self) -> CreateCommand {
        let mut cmd = CreateCommand::new(&self.name).description(&self.description);

        for opt in &self.options {
            let mut option =
                CreateCommandOption::new(opt.kind.into(), &opt.name, &opt.description)
                    .required(opt.required);

            if let Some(min_value) = opt.min_value {
                option = option.min_number_value(min_value);
            }
            if let Some(max_value) = opt.max_value {
                option = option.max_number_value(max_value);
            }
            if let Some(min_length) = opt.min_length {
                option = option.min_length(min_length);
            }
            if let Some(max_length) = opt.max_length {
                option = option.max_length(max_length);
            }
            if opt.autocomplete {
                option = option.set_autocomplete(true);
            }
            for choice in &opt.choices {
                option = match (&choice.value, opt.kind) {
                    (ChoiceValue::String(value), _) => {
                        option.add_string_choice(&choice.name, value)
                    }
                    (ChoiceValue::Integer(value), OptionKind::Number) => {
                        option.add_number_choice(&choice.name, *value as f64)
                    }
                    // validate() keeps integer choices within i32
                    (ChoiceValue::Integer(value), _) => {
                        option.add_int_choice(&choice.name, *value as i32)
                    }
                    (ChoiceValue::Number(value), _) => {
                        option.add_number_choice(&choice.name, *value)
                    }
                };
            }

            cmd = cmd.add_option(option);
        }

        cmd
    }
}
