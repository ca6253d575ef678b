//! Prompt construction for the external description generator.

use crate::pattern::Pattern;
use crate::render;
use storyline_graph::Cluster;
use storyline_syntax::LanguageConfig;

const GUIDELINE: &str = "Strictly adhere to the following guideline:\n\
- Identify concrete purposes behind the changes instead of summarizing them vaguely or discussing general goals.";

pub(crate) fn for_pattern(pattern: &Pattern, cluster: &Cluster, config: &LanguageConfig) -> String {
    match pattern {
        Pattern::Declaration(p) => {
            let declarations = render::declarations_section(p, cluster, config);
            let use_site = render::use_section(p, cluster, config);
            format!(
                "As part of a commit, the following changes, along with their location details, \
                 have been made to variable or field declarations in a project:\n\
                 ```\n{declarations}\n```\n\n\
                 The modified declarations were already in use before these changes. For \
                 reference, here is an instance of how they are used in the code:\n\
                 ```\n{use_site}\n```\n\
                 This usage is not part of the commit and is included solely to assist in \
                 understanding the changes.\n\n\
                 As a review assistant, your task is to help the reviewer understand the \
                 specific purposes of these declaration changes by identifying and describing \
                 all evident intentions behind them.\n\n{GUIDELINE}"
            )
        }
        _ => {
            let body = render::render(pattern, cluster, config);
            format!(
                "The following code, along with its location details, has been added to a \
                 project in a commit:\n\
                 ```\n{body}\n```\n\n\
                 As a review assistant, your task is to help the reviewer understand the \
                 purpose of this added code by describing all evident intentions behind it.\n\n\
                 {GUIDELINE}"
            )
        }
    }
}

pub(crate) fn for_group(descriptions: &[String]) -> String {
    format!(
        "A commit in a project includes multiple groups of changes. Each group has been \
         described independently as follows:\n\n{}\n\n\
         As a review assistant, your task is to help the reviewer understand the collective \
         intent behind these groups by providing a summary.\n\n{GUIDELINE}",
        descriptions.join("\n\n")
    )
}
