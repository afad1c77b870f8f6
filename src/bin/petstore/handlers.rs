//! Pet store handlers.

use oasbind::registry::{HandlerRegistry, HandlerRequest, HandlerResponse, RegistryError, Reply};
use oasbind::typed::{typed, TypedHandler, TypedRequest, TypedResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pet {
    pub id: i64,
    pub name: String,
}

pub fn list_pets(_req: HandlerRequest) -> anyhow::Result<HandlerResponse> {
    Reply::new().send(json!([{ "id": 57865785, "name": "srvHello, listPets!" }]))
}

#[derive(Debug, Deserialize)]
pub struct NewPet {
    pub name: String,
}

pub struct CreatePets;

impl TypedHandler for CreatePets {
    type Request = NewPet;
    type Response = Pet;

    fn handle(&self, req: TypedRequest<NewPet>) -> anyhow::Result<TypedResponse<Pet>> {
        Ok(TypedResponse::new(
            201,
            Pet {
                id: 76585,
                name: req.data.name,
            },
        ))
    }
}

#[derive(Debug, Deserialize)]
pub struct PetPath {
    #[serde(rename = "petId")]
    pub pet_id: i64,
}

pub struct ShowPetById;

impl TypedHandler for ShowPetById {
    type Request = PetPath;
    type Response = Pet;

    fn handle(&self, req: TypedRequest<PetPath>) -> anyhow::Result<TypedResponse<Pet>> {
        Ok(TypedResponse::ok(Pet {
            id: req.data.pet_id,
            name: "srvHello, showPetById!".to_string(),
        }))
    }
}

/// Registry with one handler per pet store operation.
pub fn registry() -> Result<HandlerRegistry, RegistryError> {
    HandlerRegistry::builder()
        .register("listPets", list_pets)
        .register("createPets", typed(CreatePets))
        .register("showPetById", typed(ShowPetById))
        .build()
}
