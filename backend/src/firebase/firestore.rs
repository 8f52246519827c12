use super::{FirebaseBackend, Inner, firestore_error, wire};
use crate::error::{BackendError, Result};
use crate::model::{NewTodo, Snapshot, TODOS_COLLECTION, Todo, TodoId, TodoPatch, TodoQuery};
use crate::providers::{BoxFuture, DocumentStore};
use crate::subscription::Subscription;
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;

impl Inner {
    fn post(&self, url: String, token: Option<&str>) -> reqwest::RequestBuilder {
        let request = self.http.post(url);
        match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn commit(&self, write: wire::Write) -> Result<()> {
        let token = self.bearer_token().await?;
        let response = self
            .post(format!("{}:commit", self.documents_url()), token.as_deref())
            .json(&wire::CommitRequest {
                writes: vec![write],
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let error = firestore_error(response).await;
            tracing::warn!(error = %error, "commit rejected");
            return Err(error);
        }
        self.write_committed();
        Ok(())
    }

    async fn run_query(&self, query: &TodoQuery) -> Result<Vec<Todo>> {
        let token = self.bearer_token().await?;
        let response = self
            .post(format!("{}:runQuery", self.documents_url()), token.as_deref())
            .json(&wire::owner_query(TODOS_COLLECTION, &query.owner))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(firestore_error(response).await);
        }

        let results: Vec<wire::RunQueryResponse> = response.json().await?;
        let mut todos = results
            .iter()
            .filter_map(|result| result.document.as_ref())
            .map(wire::Document::to_todo)
            .collect::<Result<Vec<_>>>()?;
        query.sort(&mut todos);
        Ok(todos)
    }

    /// Re-run `query` until the subscriber goes away or a run fails.
    ///
    /// `writes` was subscribed before the first run, so no commit is missed.
    async fn poll(
        self: Arc<Self>,
        query: TodoQuery,
        sender: watch::Sender<Snapshot>,
        mut writes: watch::Receiver<u64>,
    ) {
        let interval = self.config.poll_interval;
        loop {
            tokio::select! {
                () = tokio::time::sleep(interval) => {},
                changed = writes.changed() => {
                    if changed.is_err() {
                        break;
                    }
                },
            }
            if sender.is_closed() {
                break;
            }
            // Commits from here on trigger another run
            writes.borrow_and_update();

            match self.run_query(&query).await {
                Ok(todos) => {
                    sender.send_if_modified(|current| {
                        if matches!(current, Ok(existing) if *existing == todos) {
                            false
                        } else {
                            *current = Ok(todos);
                            true
                        }
                    });
                },
                Err(error) => {
                    tracing::warn!(owner = %query.owner, error = %error, "live query failed");
                    sender.send_replace(Err(error));
                    break;
                },
            }
        }
    }
}

impl DocumentStore for FirebaseBackend {
    fn subscribe(&self, query: TodoQuery) -> BoxFuture<'_, Result<Subscription<Snapshot>>> {
        Box::pin(async move {
            let writes = self.inner.watch_writes();
            let first = self.inner.run_query(&query).await?;
            tracing::debug!(owner = %query.owner, count = first.len(), "live query started");

            let (sender, receiver) = watch::channel(Ok(first));
            let producer = tokio::spawn(Arc::clone(&self.inner).poll(query, sender, writes));
            Ok(Subscription::with_producer(receiver, producer.abort_handle()))
        })
    }

    fn create(&self, todo: NewTodo) -> BoxFuture<'_, Result<TodoId>> {
        Box::pin(async move {
            let id = TodoId::new(Uuid::new_v4().simple().to_string());
            let write = wire::create_write(self.inner.document_name(&id), &todo);
            self.inner.commit(write).await?;
            tracing::debug!(%id, "document created");
            Ok(id)
        })
    }

    fn update<'a>(&'a self, id: &'a TodoId, patch: TodoPatch) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            if patch.is_empty() {
                return Err(BackendError::Rejected("Empty update".to_string()));
            }
            let write = wire::update_write(self.inner.document_name(id), &patch);
            self.inner.commit(write).await?;
            tracing::debug!(%id, "document updated");
            Ok(())
        })
    }

    fn delete<'a>(&'a self, id: &'a TodoId) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.inner
                .commit(wire::delete_write(self.inner.document_name(id)))
                .await?;
            tracing::debug!(%id, "document deleted");
            Ok(())
        })
    }

    fn document_path(&self, id: &TodoId) -> String {
        self.inner.document_name(id)
    }
}
