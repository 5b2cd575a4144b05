//! `vibecode models`: the model catalog.

pub fn cmd_models() {
    use vibecode::llm::{AVAILABLE_MODELS, catalog};

    println!();
    println!("Available models");
    println!("================");
    println!();
    for model in AVAILABLE_MODELS {
        let mut tags = Vec::new();
        if catalog::is_free(model.id) {
            tags.push("free");
        }
        if model.supports_reasoning {
            tags.push("reasoning");
        }
        let tags = if tags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", tags.join(", "))
        };
        println!("  {}{}", model.id, tags);
        println!("    {} - {}", model.name, model.description);
    }
    println!();
}
