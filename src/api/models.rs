use crate::api::ModelDescriptor;

/// Orders models for listing: grouped by provider, then by display name.
/// Models without a provider sort last.
pub fn sort_models(models: &mut [ModelDescriptor]) {
    models.sort_by(|a, b| match (&a.provider, &b.provider) {
        (Some(pa), Some(pb)) => pa
            .to_ascii_lowercase()
            .cmp(&pb.to_ascii_lowercase())
            .then_with(|| a.name.cmp(&b.name)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.name.cmp(&b.name),
    });
}

/// Keep `current` when the backend still offers it, otherwise fall back to
/// the first model in backend order.
pub fn resolve_selection(models: &[ModelDescriptor], current: &str) -> Option<String> {
    if models.iter().any(|model| model.id == current) {
        return Some(current.to_string());
    }
    models.first().map(|model| model.id.clone())
}

/// Look a model up by id, by case-insensitive name, or by 1-based position.
pub fn find_model<'a>(models: &'a [ModelDescriptor], query: &str) -> Option<&'a ModelDescriptor> {
    let query = query.trim();
    if query.is_empty() {
        return None;
    }
    models
        .iter()
        .find(|model| model.id == query)
        .or_else(|| {
            models
                .iter()
                .find(|model| model.name.eq_ignore_ascii_case(query))
        })
        .or_else(|| {
            query
                .parse::<usize>()
                .ok()
                .and_then(|index| index.checked_sub(1))
                .and_then(|index| models.get(index))
        })
}

pub fn model_label(model: &ModelDescriptor) -> String {
    let mut label = model.name.clone();
    if let Some(provider) = model.provider.as_deref().filter(|p| !p.is_empty()) {
        label.push_str(&format!(" ({provider})"));
    }
    if model.free == Some(true) {
        label.push_str(" [free]");
    }
    label
}
