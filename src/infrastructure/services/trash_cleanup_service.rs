use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use crate::application::dtos::trash_dto::PurgeReportDto;
use crate::application::services::trash_service::TrashService;
use crate::common::errors::Result;
use crate::domain::repositories::item_repository::ItemRepository;

/// Servicio para la limpieza automática de elementos expirados en la papelera
pub struct TrashCleanupService {
    trash_service: Arc<TrashService>,
    item_repository: Arc<dyn ItemRepository>,
    retention_days: u32,
    cleanup_interval_hours: u64,
}

impl TrashCleanupService {
    pub fn new(
        trash_service: Arc<TrashService>,
        item_repository: Arc<dyn ItemRepository>,
        retention_days: u32,
        cleanup_interval_hours: u64,
    ) -> Self {
        Self {
            trash_service,
            item_repository,
            retention_days,
            cleanup_interval_hours: cleanup_interval_hours.max(1), // Mínimo 1 hora
        }
    }

    /// Inicia el trabajo de limpieza periódica. Does nothing when retention is 0.
    #[instrument(skip(self))]
    pub fn start_cleanup_job(self: Arc<Self>) {
        if self.retention_days == 0 {
            info!("Limpieza automática de papelera desactivada (retención 0)");
            return;
        }

        info!(
            "Iniciando trabajo de limpieza de papelera: retención {} días, intervalo {} horas",
            self.retention_days, self.cleanup_interval_hours
        );

        tokio::spawn(async move {
            let interval_duration = Duration::from_secs(self.cleanup_interval_hours * 60 * 60);
            let mut interval = time::interval(interval_duration);

            // The first tick completes immediately
            loop {
                interval.tick().await;
                debug!("Ejecutando tarea programada de limpieza de papelera");

                if let Err(e) = self.cleanup_expired_items().await {
                    error!("Error en la limpieza programada de la papelera: {:?}", e);
                }
            }
        });
    }

    /// Purges every trash root whose retention has run out
    #[instrument(skip(self))]
    pub async fn cleanup_expired_items(&self) -> Result<PurgeReportDto> {
        let cutoff = Utc::now() - chrono::Duration::days(i64::from(self.retention_days));
        let expired = self.item_repository.find_trashed_before(cutoff).await?;

        let mut total = PurgeReportDto::default();
        if expired.is_empty() {
            debug!("No hay elementos expirados para limpiar");
            return Ok(total);
        }

        info!("Encontrados {} elementos expirados", expired.len());

        let mut by_owner: HashMap<Uuid, HashSet<Uuid>> = HashMap::new();
        for item in &expired {
            by_owner.entry(item.owner_id()).or_default().insert(item.id());
        }

        for (owner_id, expired_ids) in by_owner {
            // Nested items go away with their root
            let roots = match self.trash_service.root_trash(&owner_id).await {
                Ok(roots) => roots,
                Err(e) => {
                    error!("Error listando la papelera de {}: {:?}", owner_id, e);
                    continue;
                }
            };

            for root in roots.iter().filter(|root| expired_ids.contains(&root.id())) {
                debug!("Eliminando elemento expirado: id={}, owner={}", root.id(), owner_id);

                // Si falla una eliminación, continuar con las demás
                match self.trash_service.purge_tree(&root.id(), &owner_id).await {
                    Ok(report) => total.absorb(report),
                    Err(e) => error!("Error eliminando elemento expirado {}: {:?}", root.id(), e),
                }
            }
        }

        info!("Limpieza de papelera completada: {} registros", total.items_removed);
        Ok(total)
    }
}
