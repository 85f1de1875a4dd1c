use csv::Writer;
use sea_orm::{DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use tracing::info;

use crate::database::entities::extensions;
use crate::errors::{ImportExportError, ImportExportResult};

use super::extension_service::extension_views;
use super::filters::ExtensionFilter;
use super::import_service::EXTENSION_HEADERS;
use super::views::ParentView;

/// CSV export in the column layout the importer accepts, so an export can be
/// edited and fed back in.
pub struct ExportService {
    db: DatabaseConnection,
}

impl ExportService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn export_extensions(&self, filter: &ExtensionFilter) -> ImportExportResult<String> {
        let models = extensions::Entity::find()
            .filter(filter.condition()?)
            .order_by_asc(extensions::Column::Id)
            .all(&self.db)
            .await?;
        let views = extension_views(&self.db, &models).await?;

        let mut writer = Writer::from_writer(vec![]);
        writer.write_record(EXTENSION_HEADERS)?;
        for view in &views {
            // Only line parents round-trip through device/line_name.
            let (device, line_name) = match &view.parent {
                Some(ParentView::Line { name, device, .. }) => (
                    device.as_ref().map(|d| d.name.clone()).unwrap_or_default(),
                    name.clone(),
                ),
                _ => (String::new(), String::new()),
            };

            writer.write_record([
                view.dn.clone(),
                view.partition.as_ref().map(|p| p.name.clone()).unwrap_or_default(),
                view.status_label.clone(),
                device,
                line_name,
                view.description.clone().unwrap_or_default(),
            ])?;
        }

        let data = writer
            .into_inner()
            .map_err(|err| ImportExportError::Io(err.into_error()))?;
        info!("Exported {} extension(s)", views.len());
        String::from_utf8(data).map_err(|err| {
            ImportExportError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, err))
        })
    }
}
