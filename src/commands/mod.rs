use std::collections::HashMap;

use poise::serenity_prelude as serenity;

use crate::{settings::Settings, Data, Error};

pub mod issue;

pub use issue::{IssueForm, Notify, CREATE_ISSUE};

/// Commands registered with Discord, with the repository choices filled in
/// from the configuration.
pub fn commands(settings: &Settings) -> Vec<poise::Command<Data, Error>> {
    let mut create_issue = issue::create_issue();

    if let Some(repository) = create_issue
        .parameters
        .iter_mut()
        .find(|parameter| parameter.name == "repository")
    {
        // Discord hands back the index of the picked choice.
        repository.choices = settings
            .github
            .repositories
            .iter()
            .map(|repo| poise::CommandParameterChoice {
                name: repo.to_string(),
                localizations: HashMap::new(),
                __non_exhaustive: (),
            })
            .collect();
        // Plain integer option, the choices already bound it
        repository.type_setter = Some(|option| option.kind(serenity::CommandOptionType::Integer));
    }

    vec![create_issue]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        issue::Repository,
        settings::{Discord, Forms, GitHub},
    };

    fn settings() -> Settings {
        Settings {
            discord: Discord {
                token: "token".to_string(),
                allowed_user: 42,
            },
            github: GitHub {
                token: "ghp".to_string(),
                repositories: vec![
                    Repository::new("acme", "widgets").unwrap(),
                    Repository::new("acme", "gadgets").unwrap(),
                ],
                duplicate_check: true,
            },
            forms: Forms::default(),
        }
    }

    #[test]
    fn registers_a_single_createissue_command() {
        let commands = commands(&settings());

        assert_eq!(commands.len(), 1);
        let command = &commands[0];
        assert_eq!(command.name, CREATE_ISSUE);

        let parameters: Vec<_> = command
            .parameters
            .iter()
            .map(|p| (p.name.as_str(), p.required))
            .collect();
        assert_eq!(parameters, vec![("repository", true), ("shouldnotify", false)]);

        let choices: Vec<_> = command.parameters[0]
            .choices
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(choices, vec!["acme/widgets", "acme/gadgets"]);
        assert_eq!(command.parameters[1].choices.len(), 2);
    }

    #[test]
    fn registration_payload_is_stable() {
        let first = serde_json::to_value(commands(&settings())[0].create_as_slash_command()).unwrap();
        let second = serde_json::to_value(commands(&settings())[0].create_as_slash_command()).unwrap();

        assert_eq!(first, second);
        assert_eq!(first["name"], CREATE_ISSUE);
    }

    #[test]
    fn repository_option_is_a_bare_choice_list() {
        let payload = serde_json::to_value(commands(&settings())[0].create_as_slash_command()).unwrap();
        let repository = &payload["options"][0];

        assert_eq!(repository["name"], "repository");
        assert_eq!(repository["type"], 4);
        assert!(repository["min_value"].is_null());
        assert!(repository["max_value"].is_null());
        assert_eq!(repository["choices"][1]["name"], "acme/gadgets");
        assert_eq!(repository["choices"][1]["value"], 1);
    }
}
