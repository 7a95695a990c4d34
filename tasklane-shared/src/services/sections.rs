/// Section operations

use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::required;
use super::views::{SectionView, SectionWithTasks, ViewAssembler};
use crate::access::guard::{Action, AuthorizationGuard};
use crate::access::membership::EntityRef;
use crate::error::{ServiceError, ServiceResult};
use crate::hierarchy::HierarchyManager;
use crate::models::section::NewSection;
use crate::models::task::TaskFilter;
use crate::store::Store;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionInput {
    pub name: Option<String>,
    /// Defaults to one past the highest existing order
    pub order: Option<i32>,
}

/// The project's sections by order, each with its tasks by order
pub async fn list_sections(store: &dyn Store, user_id: Uuid, project_id: Uuid) -> ServiceResult<Vec<SectionWithTasks>> {
    AuthorizationGuard::new(store)
        .require(user_id, Action::ViewProject, EntityRef::Project(project_id))
        .await?;

    let assembler = ViewAssembler::new(store);
    let mut sections = Vec::new();
    for section in store.list_sections(project_id).await? {
        let tasks = store
            .list_tasks(&TaskFilter::in_section(project_id, Some(section.id)))
            .await?;
        let view = assembler.section_view(section).await?;
        sections.push(SectionWithTasks {
            section: view.section,
            tasks: assembler.task_briefs(tasks).await?,
            counts: view.counts,
        });
    }
    Ok(sections)
}

pub async fn create_section(
    store: &dyn Store,
    user_id: Uuid,
    project_id: Uuid,
    input: SectionInput,
) -> ServiceResult<SectionView> {
    let name = required(input.name, "Section name is required")?;

    AuthorizationGuard::new(store)
        .require(user_id, Action::CreateSection, EntityRef::Project(project_id))
        .await?;

    let order = match input.order {
        Some(order) => order,
        None => HierarchyManager::new(store).next_section_order(project_id).await?,
    };

    let section = store
        .create_sections(project_id, vec![NewSection::new(name, order)])
        .await?
        .into_iter()
        .next()
        .ok_or(ServiceError::NotFound("Section"))?;

    info!(user_id = %user_id, project_id = %project_id, section_id = %section.id, order, "Section created");
    Ok(ViewAssembler::new(store).section_view(section).await?)
}
