//! The specialist catalog: a closed set of delegation targets.
//!
//! Each specialist has its own system prompt and a tool subset narrowed
//! from the shared registry. The catalog is fixed at compile time; per
//! specialist knobs (model, iteration budget) come from configuration.

/// One specialist definition.
#[derive(Debug, Clone, Copy)]
pub struct SpecialistDef {
    /// The type name used in delegation requests (e.g. "research")
    pub name: &'static str,

    /// One-line capability description, advertised to the primary agent
    pub description: &'static str,

    /// System prompt for this specialist's dispatch loop
    pub system_prompt: &'static str,

    /// Names of the tools this specialist may use
    pub tools: &'static [&'static str],
}

/// The full specialist catalog.
pub const CATALOG: &[SpecialistDef] = &[
    SpecialistDef {
        name: "research",
        description: "In-depth research: gathers, verifies, and summarizes information",
        system_prompt: "You are a research specialist. Gather information from the web, \
            verify claims across sources, and produce well-organized summaries with \
            references. Be thorough and cite where each fact came from.",
        tools: &["web_search", "fetch_page", "file_read"],
    },
    SpecialistDef {
        name: "marketing",
        description: "Marketing strategy, positioning, and campaign planning",
        system_prompt: "You are a marketing specialist. Develop positioning, messaging, \
            and campaign plans grounded in the audience and channel. Be concrete: \
            deliverables, timelines, and success metrics.",
        tools: &["web_search"],
    },
    SpecialistDef {
        name: "seo",
        description: "Search engine optimization: keywords, on-page and technical SEO",
        system_prompt: "You are an SEO specialist. Analyze keyword opportunities, \
            on-page structure, and technical health. Recommend specific changes \
            ranked by expected impact.",
        tools: &["web_search", "fetch_page"],
    },
    SpecialistDef {
        name: "digital_marketing",
        description: "Digital channels: paid, social, email, and analytics",
        system_prompt: "You are a digital marketing specialist covering paid \
            acquisition, social, and email. Propose channel mixes with budgets \
            and measurable targets.",
        tools: &["web_search", "fetch_page"],
    },
    SpecialistDef {
        name: "project_management",
        description: "Project planning: scoping, scheduling, and risk tracking",
        system_prompt: "You are a project management specialist. Break work into \
            phases and tasks, estimate effort, flag risks and dependencies, and \
            keep plans in plain, skimmable structure.",
        tools: &["file_read", "file_write"],
    },
    SpecialistDef {
        name: "web_development",
        description: "Web development: architecture, implementation guidance, and review",
        system_prompt: "You are a web development specialist. Give concrete \
            architectural and implementation guidance with code where useful, \
            and review existing material critically.",
        tools: &["file_read", "file_write", "fetch_page"],
    },
];

/// Look up a specialist by type name.
pub fn find(name: &str) -> Option<&'static SpecialistDef> {
    CATALOG.iter().find(|s| s.name == name)
}

/// All specialist type names.
pub fn names() -> Vec<&'static str> {
    CATALOG.iter().map(|s| s.name).collect()
}

/// The primary agent's system prompt: a general assistant that knows the
/// catalog and the delegation convention.
pub fn primary_system_prompt() -> String {
    let mut prompt = String::from(
        "You are a capable general assistant. Answer directly when you can, \
         using your tools as needed.\n\n\
         For tasks that clearly need deep domain expertise, you may delegate \
         to one of these specialists:\n",
    );
    for specialist in CATALOG {
        prompt.push_str(&format!("- {}: {}\n", specialist.name, specialist.description));
    }
    prompt.push_str(
        "\nTo delegate, reply with exactly one JSON object on its own line:\n\
         {\"action\": \"delegate\", \"specialist\": \"<type>\", \"task\": \"<full task description>\"}\n\
         Include everything the specialist needs in the task description; it \
         cannot see this conversation. Delegate only when it genuinely helps; \
         otherwise just answer.",
    );
    prompt
}
