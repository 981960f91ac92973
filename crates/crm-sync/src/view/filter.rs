//! Case-insensitive search

use crate::domain::{Client, ProposalWithClient};

/// Fields a search term is matched against
pub trait Searchable {
    fn search_fields(&self) -> Vec<&str>;
}

impl Searchable for Client {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.name.as_str(), self.email.as_str()];
        if let Some(company) = self.company.as_deref() {
            fields.push(company);
        }
        fields
    }
}

impl Searchable for ProposalWithClient {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.title.as_str()];
        if let Some(name) = self.client_name() {
            fields.push(name);
        }
        fields
    }
}

/// Entities with any field containing `term`, in snapshot order
///
/// An empty term matches everything.
pub fn filter<'a, T: Searchable>(snapshot: &'a [T], term: &str) -> Vec<&'a T> {
    if term.is_empty() {
        return snapshot.iter().collect();
    }
    let needle = term.to_lowercase();
    snapshot
        .iter()
        .filter(|item| {
            item.search_fields()
                .iter()
                .any(|field| field.to_lowercase().contains(&needle))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Amount, ClientSummary, Proposal, ProposalStatus, UserId};
    use chrono::Utc;
    use proptest::prelude::*;

    fn client(id: &str, name: &str, company: Option<&str>) -> Client {
        Client {
            id: id.to_string(),
            user_id: UserId::new("u1"),
            name: name.to_string(),
            email: format!("{}@mail.com", id),
            phone: None,
            company: company.map(str::to_string),
            notes: None,
            created_at: Utc::now(),
        }
    }

    fn proposal(id: &str, title: &str, client: Option<&str>) -> ProposalWithClient {
        let now = Utc::now();
        ProposalWithClient::new(
            Proposal {
                id: id.to_string(),
                user_id: UserId::new("u1"),
                client_id: "c1".to_string(),
                title: title.to_string(),
                amount: Amount::from(100),
                status: ProposalStatus::Open,
                created_at: now,
                updated_at: now,
            },
            client.map(|name| ClientSummary {
                id: "c1".to_string(),
                name: name.to_string(),
                email: "c1@mail.com".to_string(),
                company: None,
            }),
        )
    }

    #[test]
    fn test_client_filter_matches_name_email_company() {
        let clients = vec![
            client("a", "Ana Souza", None),
            client("b", "Bruno", Some("Acme Ltda")),
            client("c", "Carla", None),
        ];
        let ids = |found: Vec<&Client>| found.iter().map(|c| c.id.clone()).collect::<Vec<_>>();

        assert_eq!(ids(filter(&clients, "SOUZA")), vec!["a"]);
        assert_eq!(ids(filter(&clients, "acme")), vec!["b"]);
        assert_eq!(ids(filter(&clients, "c@mail")), vec!["c"]);
        assert!(filter(&clients, "zzz").is_empty());
    }

    #[test]
    fn test_proposal_filter_matches_title_and_client_name() {
        let proposals = vec![
            proposal("p1", "Website", Some("Ana")),
            proposal("p2", "Logo", Some("Bruno")),
            proposal("p3", "App", None),
        ];
        let found: Vec<&str> = filter(&proposals, "ana")
            .iter()
            .map(|p| p.id.as_str())
            .collect();
        assert_eq!(found, vec!["p1"]);
        assert_eq!(filter(&proposals, "logo").len(), 1);
    }

    proptest! {
        #[test]
        fn empty_term_returns_snapshot_unchanged(names in proptest::collection::vec("[A-Za-z ]{0,8}", 0..12)) {
            let clients: Vec<Client> = names
                .iter()
                .enumerate()
                .map(|(i, name)| client(&i.to_string(), name, None))
                .collect();
            let found: Vec<Client> = filter(&clients, "").into_iter().cloned().collect();
            prop_assert_eq!(found, clients);
        }
    }
}
