#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub action: &'static str,
}

/// Commands whose whole remainder is one free-text value.
pub(crate) const FORM_FIELD_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "brand",
        action: "set_brand_name",
    },
    CommandSpec {
        command: "industry",
        action: "set_industry",
    },
    CommandSpec {
        command: "style",
        action: "set_style",
    },
    CommandSpec {
        command: "palette",
        action: "set_palette",
    },
    CommandSpec {
        command: "details",
        action: "set_details",
    },
    CommandSpec {
        command: "slogan",
        action: "set_slogan",
    },
    CommandSpec {
        command: "threshold",
        action: "set_threshold",
    },
];

pub(crate) const NO_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "generate",
        action: "generate",
    },
    CommandSpec {
        command: "form",
        action: "show_form",
    },
    CommandSpec {
        command: "history",
        action: "show_history",
    },
    CommandSpec {
        command: "clear",
        action: "clear_history",
    },
    CommandSpec {
        command: "library",
        action: "open_library",
    },
    CommandSpec {
        command: "create",
        action: "open_create",
    },
    CommandSpec {
        command: "help",
        action: "help",
    },
    CommandSpec {
        command: "quit",
        action: "quit",
    },
];

pub(crate) const EXPORT_COMMAND: CommandSpec = CommandSpec {
    command: "export",
    action: "export",
};

pub const STUDIO_HELP_COMMANDS: &[&str] = &[
    "/brand",
    "/industry",
    "/style",
    "/palette",
    "/details",
    "/slogan",
    "/threshold",
    "/form",
    "/generate",
    "/history",
    "/export",
    "/clear",
    "/library",
    "/create",
    "/help",
    "/quit",
];
