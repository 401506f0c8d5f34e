//! Interaction handlers and their registry keys.

pub mod avatar;
pub mod edit;
pub mod ping;
pub mod reaction_roles;
pub mod views;
pub mod welcome;

use crate::dispatch::{Ack, DispatchRegistry, HandlerRegistration, Kind};

use self::avatar::{
    AvatarAutocomplete, AvatarCommand, AvatarFormSubmit, AvatarList, AvatarSelect, CancelWizard,
    CreateAvatarButton, SpeciesSelect,
};
use self::edit::{DeleteAvatar, EditAvatar, EditField, LevelUp};
use self::ping::Ping;
use self::reaction_roles::{ReactionRoleCommand, RemoveReactionRole};
use self::welcome::WelcomeCommand;

/// Register every handler. Parameterized buttons are keyed by their prefix
/// and reached through substring or suffix-strip resolution.
pub fn register_all(registry: &mut DispatchRegistry) {
    registry
        .register(HandlerRegistration::new("avatar/avatar", Kind::Slash, AvatarCommand))
        .register(HandlerRegistration::new("autocomplete/avatar", Kind::Autocomplete, AvatarAutocomplete))
        .register(HandlerRegistration::new("selects/avatar", Kind::Select, AvatarSelect))
        .register(
            HandlerRegistration::new("buttons/create_avatar", Kind::Button, CreateAvatarButton)
                .with_ack(Ack::Modal),
        )
        .register(HandlerRegistration::new("modals/avatar_form", Kind::Modal, AvatarFormSubmit))
        .register(HandlerRegistration::new("selects/species_select", Kind::Select, SpeciesSelect))
        .register(HandlerRegistration::new("buttons/cancel_avatar", Kind::Button, CancelWizard))
        .register(HandlerRegistration::new(
            "buttons/edit_name_",
            Kind::Button,
            EditAvatar { field: EditField::Name },
        ))
        .register(HandlerRegistration::new(
            "buttons/edit_bracket_",
            Kind::Button,
            EditAvatar { field: EditField::Bracket },
        ))
        .register(HandlerRegistration::new(
            "buttons/edit_avatar_url_",
            Kind::Button,
            EditAvatar { field: EditField::IconUrl },
        ))
        .register(HandlerRegistration::new("buttons/delete_avatar_", Kind::Button, DeleteAvatar))
        .register(HandlerRegistration::new("buttons/levelup_", Kind::Button, LevelUp))
        .register(HandlerRegistration::new("buttons/back", Kind::Button, AvatarList))
        .register(HandlerRegistration::new("buttons/refresh", Kind::Button, AvatarList))
        .register(HandlerRegistration::new("welcome/welcome", Kind::Slash, WelcomeCommand))
        .register(HandlerRegistration::new("rr/rr", Kind::Slash, ReactionRoleCommand))
        .register(HandlerRegistration::new("selects/select_rr", Kind::Select, RemoveReactionRole))
        .register(HandlerRegistration::new("ping", Kind::Slash, Ping));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> DispatchRegistry {
        let mut registry = DispatchRegistry::new();
        register_all(&mut registry);
        registry
    }

    #[test]
    fn test_every_component_reaches_its_handler() {
        let registry = registry();
        let cases = [
            (Kind::Slash, "avatar", "avatar/avatar"),
            (Kind::Autocomplete, "avatar", "autocomplete/avatar"),
            (Kind::Select, "avatar", "selects/avatar"),
            (Kind::Button, "create_avatar", "buttons/create_avatar"),
            (Kind::Modal, "avatar_form", "modals/avatar_form"),
            (Kind::Select, "species_select_42", "selects/species_select"),
            (Kind::Button, "cancel_avatar", "buttons/cancel_avatar"),
            (Kind::Button, "edit_name_7", "buttons/edit_name_"),
            (Kind::Button, "edit_bracket_7", "buttons/edit_bracket_"),
            (Kind::Button, "edit_avatar_url_7", "buttons/edit_avatar_url_"),
            (Kind::Button, "delete_avatar_7", "buttons/delete_avatar_"),
            (Kind::Button, "levelup_7", "buttons/levelup_"),
            (Kind::Button, "back", "buttons/back"),
            (Kind::Button, "refresh", "buttons/refresh"),
            (Kind::Slash, "welcome", "welcome/welcome"),
            (Kind::Slash, "rr", "rr/rr"),
            (Kind::Select, "select_rr", "selects/select_rr"),
            (Kind::Slash, "ping", "ping"),
        ];
        for (kind, identifier, key) in cases {
            let hit = registry.resolve(kind, identifier).map(|r| r.key.as_str());
            assert_eq!(hit, Some(key), "{} '{}'", kind, identifier);
        }
    }

    #[test]
    fn test_only_the_create_button_skips_deferral() {
        let registry = registry();
        assert_eq!(registry.resolve(Kind::Button, "create_avatar").unwrap().ack, Ack::Modal);
        assert_eq!(registry.resolve(Kind::Button, "levelup_1").unwrap().ack, Ack::Defer);
    }

    #[test]
    fn test_unknown_ids_miss() {
        let registry = registry();
        assert!(registry.resolve(Kind::Button, "launch_rockets").is_none());
        assert!(registry.resolve(Kind::Autocomplete, "welcome").is_none());
    }
}
